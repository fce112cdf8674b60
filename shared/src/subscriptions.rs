use std::{collections::HashSet, hash::Hash};

use serde::{Deserialize, Serialize};

/// Matches Scopes carrying `key` with the encoded value `val`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub val: String,
}

impl KeyValue {
    pub fn new(key: &str, val: &serde_json::Value) -> Self {
        Self {
            key: key.to_string(),
            val: val.to_string(),
        }
    }
}

/// Interest in Scopes, declared by listener code. Every populated field widens
/// the set of Scopes streamed to this session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeSubscription {
    pub ids: Vec<String>,
    pub kinds: Vec<String>,
    pub names: Vec<String>,
    pub keys: Vec<String>,
    pub kvs: Vec<KeyValue>,
}

impl ScopeSubscription {
    pub fn ids<I: IntoIterator<Item = S>, S: Into<String>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn kinds<I: IntoIterator<Item = S>, S: Into<String>>(kinds: I) -> Self {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn names<I: IntoIterator<Item = S>, S: Into<String>>(names: I) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn keys<I: IntoIterator<Item = S>, S: Into<String>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn kvs<I: IntoIterator<Item = KeyValue>>(kvs: I) -> Self {
        Self {
            kvs: kvs.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// One "fetch matching scoped attributes" request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopedFilter {
    Ids(Vec<String>),
    Kinds(Vec<String>),
    Names(Vec<String>),
    Keys(Vec<String>),
    Kvs(Vec<KeyValue>),
}

/// Interest added since the previous drain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionDelta {
    pub scopes: ScopeSubscription,
    pub peers: bool,
    pub transitions: Vec<String>,
}

impl SubscriptionDelta {
    /// One filter per populated Scope dimension
    pub fn filters(&self) -> Vec<ScopedFilter> {
        let mut filters = Vec::new();
        if !self.scopes.ids.is_empty() {
            filters.push(ScopedFilter::Ids(self.scopes.ids.clone()));
        }
        if !self.scopes.kinds.is_empty() {
            filters.push(ScopedFilter::Kinds(self.scopes.kinds.clone()));
        }
        if !self.scopes.names.is_empty() {
            filters.push(ScopedFilter::Names(self.scopes.names.clone()));
        }
        if !self.scopes.keys.is_empty() {
            filters.push(ScopedFilter::Keys(self.scopes.keys.clone()));
        }
        if !self.scopes.kvs.is_empty() {
            filters.push(ScopedFilter::Kvs(self.scopes.kvs.clone()));
        }
        filters
    }
}

// Insertion-ordered, grow-only set remembering how much was already drained
struct Dimension<T: Clone + Eq + Hash> {
    items: Vec<T>,
    index: HashSet<T>,
    drained: usize,
}

impl<T: Clone + Eq + Hash> Dimension<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::new(),
            drained: 0,
        }
    }

    fn add(&mut self, item: T) -> bool {
        if self.index.contains(&item) {
            return false;
        }
        self.index.insert(item.clone());
        self.items.push(item);
        true
    }

    fn drain(&mut self) -> Vec<T> {
        let delta = self.items[self.drained..].to_vec();
        self.drained = self.items.len();
        delta
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Accumulated interest of one session.
///
/// Interest only grows; [`SubscriptionSet::drain`] hands out what was added
/// since the previous drain, so each piece of interest is requested once.
pub struct SubscriptionSet {
    ids: Dimension<String>,
    kinds: Dimension<String>,
    names: Dimension<String>,
    keys: Dimension<String>,
    kvs: Dimension<KeyValue>,
    transitions: Dimension<String>,
    peers: bool,
    peers_drained: bool,
    dirty: bool,
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self {
            ids: Dimension::new(),
            kinds: Dimension::new(),
            names: Dimension::new(),
            keys: Dimension::new(),
            kvs: Dimension::new(),
            transitions: Dimension::new(),
            peers: false,
            peers_drained: false,
            dirty: false,
        }
    }

    pub fn add_ids<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, ids: I) {
        for id in ids {
            self.dirty |= self.ids.add(id.into());
        }
    }

    pub fn add_kinds<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, kinds: I) {
        for kind in kinds {
            self.dirty |= self.kinds.add(kind.into());
        }
    }

    pub fn add_names<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, names: I) {
        for name in names {
            self.dirty |= self.names.add(name.into());
        }
    }

    pub fn add_keys<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, keys: I) {
        for key in keys {
            self.dirty |= self.keys.add(key.into());
        }
    }

    pub fn add_kvs<I: IntoIterator<Item = KeyValue>>(&mut self, kvs: I) {
        for kv in kvs {
            self.dirty |= self.kvs.add(kv);
        }
    }

    pub fn add_scope(&mut self, subscription: ScopeSubscription) {
        self.add_ids(subscription.ids);
        self.add_kinds(subscription.kinds);
        self.add_names(subscription.names);
        self.add_keys(subscription.keys);
        self.add_kvs(subscription.kvs);
    }

    pub fn add_peer_events(&mut self) {
        if !self.peers {
            self.peers = true;
            self.dirty = true;
        }
    }

    pub fn add_transition_watch(&mut self, step_id: &str) {
        self.dirty |= self.transitions.add(step_id.to_string());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Interest added since the previous drain, or `None` if nothing new.
    pub fn drain(&mut self) -> Option<SubscriptionDelta> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let peers = self.peers && !self.peers_drained;
        self.peers_drained = self.peers;

        Some(SubscriptionDelta {
            scopes: ScopeSubscription {
                ids: self.ids.drain(),
                kinds: self.kinds.drain(),
                names: self.names.drain(),
                keys: self.keys.drain(),
                kvs: self.kvs.drain(),
            },
            peers,
            transitions: self.transitions.drain(),
        })
    }

    /// Total number of distinct Scope interests declared this session
    pub fn len(&self) -> usize {
        self.ids.len() + self.kinds.len() + self.names.len() + self.keys.len() + self.kvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
