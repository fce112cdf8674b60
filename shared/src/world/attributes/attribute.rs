use log::warn;
use serde_json::Value;

use crate::{world::attributes::error::AttributeError, AttributeChange};

/// Longest vector a single Attribute may hold
pub const MAX_VECTOR_LEN: usize = 100_000;

/// Materialized state of one Attribute of one Scope.
///
/// The record outlives tombstones: a removed Attribute keeps its slot and reads
/// as absent, so lookups made before the removal keep working.
#[derive(Clone, Debug)]
pub struct Attribute {
    node_id: String,
    key: String,
    change: Option<AttributeChange>,
    items: Option<Vec<Option<AttributeChange>>>,
}

impl Attribute {
    pub(crate) fn new(node_id: &str, key: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            key: key.to_string(),
            change: None,
            items: None,
        }
    }

    pub(crate) fn from_change(node_id: &str, change: AttributeChange) -> Result<Self, AttributeError> {
        let mut attribute = Self::new(node_id, &change.key);
        attribute.apply(change)?;
        Ok(attribute)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identifier of the current write, if any
    pub fn id(&self) -> Option<&str> {
        self.change.as_ref().map(|change| change.id.as_str())
    }

    pub fn version(&self) -> Option<u64> {
        self.change.as_ref().map(|change| change.version)
    }

    pub fn is_vector(&self) -> bool {
        self.items.is_some()
    }

    /// Current value, decoded from its wire form. Vectors read as an array with
    /// `null` in unset slots.
    pub fn value(&self) -> Option<Value> {
        if let Some(items) = &self.items {
            let values = items
                .iter()
                .map(|item| {
                    item.as_ref()
                        .and_then(|change| self.decode(change))
                        .unwrap_or(Value::Null)
                })
                .collect();
            return Some(Value::Array(values));
        }

        self.change.as_ref().and_then(|change| self.decode(change))
    }

    /// Decoded vector items, or `None` for scalar attributes
    pub fn items(&self) -> Option<Vec<Option<Value>>> {
        self.items.as_ref().map(|items| {
            items
                .iter()
                .map(|item| item.as_ref().and_then(|change| self.decode(change)))
                .collect()
        })
    }

    /// Wire form of the current scalar value
    pub fn raw(&self) -> Option<&str> {
        self.change.as_ref().and_then(|change| change.val.as_deref())
    }

    /// Applies a write. Returns `Ok(false)` when the same write was already
    /// applied.
    pub(crate) fn apply(&mut self, change: AttributeChange) -> Result<bool, AttributeError> {
        if change.vector {
            return self.apply_item(change);
        }

        if let Some(current) = &self.change {
            if current.is_same_write(&change) {
                return Ok(false);
            }
        }

        self.items = None;
        self.change = Some(change);
        Ok(true)
    }

    fn apply_item(&mut self, change: AttributeChange) -> Result<bool, AttributeError> {
        let Some(index) = change.index else {
            return Err(AttributeError::VectorMissingIndex {
                attribute_id: change.id,
                key: change.key,
            });
        };

        if index >= MAX_VECTOR_LEN {
            return Err(AttributeError::VectorIndexOutOfRange {
                attribute_id: change.id,
                key: change.key,
                index,
                limit: MAX_VECTOR_LEN,
            });
        }

        let items = self.items.get_or_insert_with(Vec::new);
        if items.len() <= index {
            items.resize(index + 1, None);
        }

        if let Some(current) = &items[index] {
            if current.is_same_write(&change) {
                return Ok(false);
            }
        }

        items[index] = Some(change);
        self.change = None;
        Ok(true)
    }

    /// Tombstones the value. Returns whether anything was cleared.
    pub(crate) fn clear(&mut self) -> bool {
        let had_value = self.change.is_some() || self.items.is_some();
        self.change = None;
        self.items = None;
        had_value
    }

    fn decode(&self, change: &AttributeChange) -> Option<Value> {
        let raw = change.val.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "attributes: undecodable value for {}.{}: {}",
                    self.node_id, self.key, err
                );
                None
            }
        }
    }
}
