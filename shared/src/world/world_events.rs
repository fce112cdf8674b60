use std::vec::IntoIter;

use serde_json::Value;

/// A live Scope of `kind` was created or had Attributes change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeUpdate {
    pub kind: String,
    pub scope_id: String,
}

/// An Attribute of a Scope of `kind` received a new value
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeUpdate {
    pub kind: String,
    pub key: String,
    pub scope_id: String,
    pub attribute_id: Option<String>,
    pub value: Option<Value>,
}

/// Notifications produced by one commit, tagged with its batch sequence
/// number.
pub struct WorldEvents {
    seq: u64,
    scope_updates: Vec<ScopeUpdate>,
    attribute_updates: Vec<AttributeUpdate>,
    scope_removals: Vec<ScopeUpdate>,
    empty: bool,
}

impl WorldEvents {
    pub(crate) fn new(seq: u64) -> Self {
        Self {
            seq,
            scope_updates: Vec::new(),
            attribute_updates: Vec::new(),
            scope_removals: Vec::new(),
            empty: true,
        }
    }

    /// Sequence number of the batch these events belong to
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: WorldEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: WorldEvent>(&self) -> bool {
        V::has(self)
    }

    pub(crate) fn push_scope_update(&mut self, kind: &str, scope_id: &str) {
        self.scope_updates.push(ScopeUpdate {
            kind: kind.to_string(),
            scope_id: scope_id.to_string(),
        });
        self.empty = false;
    }

    pub(crate) fn push_attribute_update(&mut self, update: AttributeUpdate) {
        self.attribute_updates.push(update);
        self.empty = false;
    }

    pub(crate) fn push_scope_removal(&mut self, kind: &str, scope_id: &str) {
        self.scope_removals.push(ScopeUpdate {
            kind: kind.to_string(),
            scope_id: scope_id.to_string(),
        });
        self.empty = false;
    }
}

// Event Trait
pub trait WorldEvent {
    type Iter;

    fn iter(events: &mut WorldEvents) -> Self::Iter;

    fn has(events: &WorldEvents) -> bool;
}

// Scope Update Event
pub struct ScopeUpdateEvent;
impl WorldEvent for ScopeUpdateEvent {
    type Iter = IntoIter<ScopeUpdate>;

    fn iter(events: &mut WorldEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.scope_updates);
        IntoIterator::into_iter(list)
    }

    fn has(events: &WorldEvents) -> bool {
        !events.scope_updates.is_empty()
    }
}

// Attribute Update Event
pub struct AttributeUpdateEvent;
impl WorldEvent for AttributeUpdateEvent {
    type Iter = IntoIter<AttributeUpdate>;

    fn iter(events: &mut WorldEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.attribute_updates);
        IntoIterator::into_iter(list)
    }

    fn has(events: &WorldEvents) -> bool {
        !events.attribute_updates.is_empty()
    }
}

// Scope Removal Event
pub struct ScopeRemovalEvent;
impl WorldEvent for ScopeRemovalEvent {
    type Iter = IntoIter<ScopeUpdate>;

    fn iter(events: &mut WorldEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.scope_removals);
        IntoIterator::into_iter(list)
    }

    fn has(events: &WorldEvents) -> bool {
        !events.scope_removals.is_empty()
    }
}
