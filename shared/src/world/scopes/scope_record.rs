use crate::ScopeIdent;

/// Identity and lifecycle flags of one materialized Scope
#[derive(Clone, Debug)]
pub struct ScopeRecord {
    id: String,
    kind: String,
    name: Option<String>,
    updated: bool,
    deleted: bool,
}

impl ScopeRecord {
    pub(crate) fn new(ident: &ScopeIdent, kind: &str) -> Self {
        Self {
            id: ident.id.clone(),
            kind: kind.to_string(),
            name: ident.name.clone(),
            updated: true,
            deleted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Immutable once the Scope is created
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set on removal. The record stays queryable by ID until the next commit
    /// sweeps it.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.updated
    }

    pub(crate) fn mark_updated(&mut self) {
        self.updated = true;
    }

    pub(crate) fn clear_updated(&mut self) {
        self.updated = false;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
        self.updated = true;
    }

    pub(crate) fn restore(&mut self) {
        self.deleted = false;
    }
}
