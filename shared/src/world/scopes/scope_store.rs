use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::warn;

use crate::{
    world::{
        attributes::attribute_store::{AttributeCommit, AttributeStore},
        scopes::{error::ScopeError, scope_record::ScopeRecord},
    },
    ScopeIdent, ScopeKinds,
};

/// What a commit published
#[derive(Debug, Default)]
pub struct ScopeCommit {
    /// `(kind, scope ID)` of live Scopes that were created or whose Attributes
    /// changed, in arrival order
    pub updated: Vec<(String, String)>,
    /// `(kind, scope ID)` of Scopes removed by this commit
    pub removed: Vec<(String, String)>,
    pub attributes: AttributeCommit,
}

/// Scope events buffered since the last commit, lifted out of the store
#[derive(Default)]
pub(crate) struct PendingScopes {
    updates: Vec<(ScopeIdent, bool)>,
    pending_adds: HashSet<String>,
    kinds_updated: HashSet<String>,
}

/// Materializes Scopes of known Kinds and indexes them per Kind.
///
/// Scope events are buffered like Attribute updates and applied on
/// [`ScopeStore::commit`].
pub struct ScopeStore {
    kinds: Arc<ScopeKinds>,
    records: HashMap<String, ScopeRecord>,
    by_kind: HashMap<String, Vec<String>>,
    updates: Vec<(ScopeIdent, bool)>,
    pending_adds: HashSet<String>,
    kinds_updated: HashSet<String>,
    sweep: Vec<String>,
}

impl ScopeStore {
    pub fn new(kinds: Arc<ScopeKinds>) -> Self {
        Self {
            kinds,
            records: HashMap::new(),
            by_kind: HashMap::new(),
            updates: Vec::new(),
            pending_adds: HashSet::new(),
            kinds_updated: HashSet::new(),
            sweep: Vec::new(),
        }
    }

    /// Buffers a Scope event. New Scopes must carry a Kind from the Kind table.
    pub fn apply_scope_event(&mut self, ident: ScopeIdent, removed: bool) -> Result<(), ScopeError> {
        let known = self.records.contains_key(&ident.id) || self.pending_adds.contains(&ident.id);

        if removed {
            if !known {
                return Err(ScopeError::MissingOnRemoval { scope_id: ident.id });
            }
            if let Some(kind) = self
                .records
                .get(&ident.id)
                .map(|record| record.kind().to_string())
                .or_else(|| ident.kind().map(str::to_string))
            {
                self.kinds_updated.insert(kind);
            }
            self.updates.push((ident, true));
            return Ok(());
        }

        if !known {
            let Some(kind) = ident.kind() else {
                return Err(ScopeError::MissingKind { scope_id: ident.id });
            };
            if !self.kinds.contains(kind) {
                return Err(ScopeError::UnknownKind {
                    scope_id: ident.id.clone(),
                    kind: kind.to_string(),
                });
            }
            self.kinds_updated.insert(kind.to_string());
            self.pending_adds.insert(ident.id.clone());
        }

        self.updates.push((ident, false));
        Ok(())
    }

    /// Sweeps Scopes deleted by the previous commit, applies buffered Scope
    /// events, then commits `attributes`.
    pub fn commit(&mut self, attributes: &mut AttributeStore) -> ScopeCommit {
        for id in std::mem::take(&mut self.sweep) {
            let deleted = self
                .records
                .get(&id)
                .map(ScopeRecord::is_deleted)
                .unwrap_or(false);
            if deleted {
                self.records.remove(&id);
                attributes.evict(&id);
            }
        }

        self.kinds_updated.clear();
        self.pending_adds.clear();

        let mut commit = ScopeCommit::default();
        let mut touched = Vec::new();

        for (ident, removed) in std::mem::take(&mut self.updates) {
            if removed {
                self.remove(&ident.id, &mut commit.removed);
                continue;
            }

            if let Some(record) = self.records.get_mut(&ident.id) {
                if record.is_deleted() {
                    record.restore();
                    record.mark_updated();
                    self.by_kind
                        .entry(record.kind().to_string())
                        .or_default()
                        .push(ident.id.clone());
                    self.sweep.retain(|id| *id != ident.id);
                    commit
                        .removed
                        .retain(|(_, removed_id)| *removed_id != ident.id);
                    touched.push(ident.id);
                }
                continue;
            }

            let Some(kind) = ident.kind().map(str::to_string) else {
                warn!("scopes: scope missing kind: {}", ident.id);
                continue;
            };
            self.records
                .insert(ident.id.clone(), ScopeRecord::new(&ident, &kind));
            self.by_kind.entry(kind).or_default().push(ident.id.clone());
            touched.push(ident.id);
        }

        commit.attributes = attributes.commit();

        let mut seen = HashSet::new();
        for id in touched.iter().chain(commit.attributes.changed_scopes.iter()) {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };
            let was_updated = record.is_updated();
            record.clear_updated();
            if record.is_deleted() {
                continue;
            }
            if (was_updated || commit.attributes.changed_scopes.contains(id)) && seen.insert(id.clone()) {
                commit
                    .updated
                    .push((record.kind().to_string(), id.clone()));
            }
        }

        commit
    }

    fn remove(&mut self, id: &str, removed: &mut Vec<(String, String)>) {
        let Some(record) = self.records.get_mut(id) else {
            warn!("scopes: missing scope on removal: {}", id);
            return;
        };
        if record.is_deleted() {
            return;
        }

        record.mark_deleted();
        record.clear_updated();
        let kind = record.kind().to_string();
        if let Some(ids) = self.by_kind.get_mut(&kind) {
            ids.retain(|existing| existing != id);
        }
        self.sweep.push(id.to_string());
        removed.push((kind, id.to_string()));
    }

    /// Live or freshly deleted Scope by ID
    pub fn scope(&self, id: &str) -> Option<&ScopeRecord> {
        self.records.get(id)
    }

    /// Live Scopes of a Kind, in creation order
    pub fn by_kind<'s>(&'s self, kind: &str) -> impl Iterator<Item = &'s ScopeRecord> + 's {
        self.by_kind
            .get(kind)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.records.get(id))
    }

    /// Whether a Scope of this Kind was added or removed since the last commit
    pub fn kind_was_updated(&self, kind: &str) -> bool {
        self.kinds_updated.contains(kind)
    }

    pub fn has_pending(&self) -> bool {
        !self.updates.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> PendingScopes {
        PendingScopes {
            updates: std::mem::take(&mut self.updates),
            pending_adds: std::mem::take(&mut self.pending_adds),
            kinds_updated: std::mem::take(&mut self.kinds_updated),
        }
    }

    /// Puts back events lifted by [`ScopeStore::take_pending`]. Called right
    /// after a commit, with nothing buffered in between.
    pub(crate) fn restore_pending(&mut self, pending: PendingScopes) {
        self.updates = pending.updates;
        self.pending_adds = pending.pending_adds;
        self.kinds_updated = pending.kinds_updated;
    }

    pub fn kinds(&self) -> &ScopeKinds {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
