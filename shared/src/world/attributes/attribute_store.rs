use std::collections::{HashMap, HashSet};

use log::error;
use serde_json::Value;

use crate::{
    world::attributes::{
        attribute::{Attribute, MAX_VECTOR_LEN},
        error::AttributeError,
    },
    AttributeChange,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PendingKey {
    key: String,
    index: Option<usize>,
}

#[derive(Clone, Debug)]
enum PendingUpdate {
    Set(AttributeChange),
    Tombstone,
}

/// Updates buffered since the last commit, lifted out of the store
#[derive(Default)]
pub(crate) struct PendingAttributes {
    updates: HashMap<String, Vec<(PendingKey, PendingUpdate)>>,
    update_order: Vec<String>,
}

/// What a commit changed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AttributeCommit {
    /// Scope IDs with at least one changed Attribute, in arrival order
    pub changed_scopes: Vec<String>,
    /// `(scope ID, key)` of Attributes that received a new value, in arrival order
    pub changed_attributes: Vec<(String, String)>,
}

impl AttributeCommit {
    pub fn is_empty(&self) -> bool {
        self.changed_scopes.is_empty()
    }
}

/// Versioned key/value records per Scope ID.
///
/// Updates are buffered until [`AttributeStore::commit`]; reads only ever see
/// committed state, except through [`AttributeStore::peek_next`].
#[derive(Default)]
pub struct AttributeStore {
    attrs: HashMap<String, HashMap<String, Attribute>>,
    updates: HashMap<String, Vec<(PendingKey, PendingUpdate)>>,
    update_order: Vec<String>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers an update (or tombstone) until the next commit.
    ///
    /// Within one batch the last write to a key wins.
    pub fn apply_update(
        &mut self,
        change: AttributeChange,
        removed: bool,
    ) -> Result<(), AttributeError> {
        let Some(node_id) = change.owner_id().map(str::to_string) else {
            return Err(AttributeError::MissingNodeId {
                attribute_id: change.id,
                key: change.key,
            });
        };

        let (pending_key, update) = if removed {
            (
                PendingKey {
                    key: change.key,
                    index: None,
                },
                PendingUpdate::Tombstone,
            )
        } else {
            if change.vector && change.index.is_none() {
                return Err(AttributeError::VectorMissingIndex {
                    attribute_id: change.id,
                    key: change.key,
                });
            }
            let index = if change.vector { change.index } else { None };
            if let Some(index) = index.filter(|index| *index >= MAX_VECTOR_LEN) {
                return Err(AttributeError::VectorIndexOutOfRange {
                    attribute_id: change.id,
                    key: change.key,
                    index,
                    limit: MAX_VECTOR_LEN,
                });
            }
            (
                PendingKey {
                    key: change.key.clone(),
                    index,
                },
                PendingUpdate::Set(change),
            )
        };

        if !self.updates.contains_key(&node_id) {
            self.update_order.push(node_id.clone());
        }
        let scope_updates = self.updates.entry(node_id).or_default();
        match scope_updates
            .iter_mut()
            .find(|(existing, _)| *existing == pending_key)
        {
            Some((_, slot)) => *slot = update,
            None => scope_updates.push((pending_key, update)),
        }

        Ok(())
    }

    /// Publishes every buffered update.
    pub fn commit(&mut self) -> AttributeCommit {
        let mut commit = AttributeCommit::default();
        let mut seen_attributes = HashSet::new();

        for node_id in std::mem::take(&mut self.update_order) {
            let Some(updates) = self.updates.remove(&node_id) else {
                continue;
            };

            let scope_attrs = self.attrs.entry(node_id.clone()).or_default();
            let mut scope_changed = false;

            for (pending_key, update) in updates {
                match update {
                    PendingUpdate::Tombstone => {
                        if let Some(attribute) = scope_attrs.get_mut(&pending_key.key) {
                            if attribute.clear() {
                                scope_changed = true;
                            }
                        }
                    }
                    PendingUpdate::Set(change) => {
                        let attribute = scope_attrs
                            .entry(pending_key.key.clone())
                            .or_insert_with(|| Attribute::new(&node_id, &pending_key.key));
                        match attribute.apply(change) {
                            Ok(true) => {
                                scope_changed = true;
                                let entry = (node_id.clone(), pending_key.key);
                                if seen_attributes.insert(entry.clone()) {
                                    commit.changed_attributes.push(entry);
                                }
                            }
                            Ok(false) => {}
                            Err(err) => {
                                error!("attributes: {}", err);
                            }
                        }
                    }
                }
            }

            if scope_changed {
                commit.changed_scopes.push(node_id);
            }
        }

        commit
    }

    /// Last committed value
    pub fn get(&self, node_id: &str, key: &str) -> Option<Value> {
        self.attribute(node_id, key).and_then(Attribute::value)
    }

    pub fn attribute(&self, node_id: &str, key: &str) -> Option<&Attribute> {
        self.attrs.get(node_id).and_then(|attrs| attrs.get(key))
    }

    /// Every Attribute record of a Scope, including tombstoned ones
    pub fn attributes(&self, node_id: &str) -> impl Iterator<Item = &Attribute> {
        self.attrs.get(node_id).into_iter().flat_map(|attrs| attrs.values())
    }

    /// Value "as it will be" after the next commit: the pending write if there
    /// is one, the committed value otherwise.
    pub fn peek_next(&self, node_id: &str, key: &str) -> Option<Value> {
        let pending = self.updates.get(node_id).and_then(|updates| {
            updates
                .iter()
                .rev()
                .find(|(pending_key, _)| pending_key.key == key && pending_key.index.is_none())
        });

        match pending {
            Some((_, PendingUpdate::Tombstone)) => None,
            Some((_, PendingUpdate::Set(change))) => {
                if change.val.is_none() {
                    return None;
                }
                Attribute::from_change(node_id, change.clone())
                    .ok()
                    .and_then(|attribute| attribute.value())
            }
            None => self.get(node_id, key),
        }
    }

    /// Whether a Scope has buffered updates awaiting commit
    pub fn scope_was_updated(&self, node_id: &str) -> bool {
        self.updates.contains_key(node_id)
    }

    pub fn has_pending(&self) -> bool {
        !self.update_order.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> PendingAttributes {
        PendingAttributes {
            updates: std::mem::take(&mut self.updates),
            update_order: std::mem::take(&mut self.update_order),
        }
    }

    /// Puts back updates lifted by [`AttributeStore::take_pending`]. Called
    /// right after a commit, with nothing buffered in between.
    pub(crate) fn restore_pending(&mut self, pending: PendingAttributes) {
        self.updates = pending.updates;
        self.update_order = pending.update_order;
    }

    /// Drops every record of a Scope
    pub(crate) fn evict(&mut self, node_id: &str) {
        self.attrs.remove(node_id);
    }
}
