use std::collections::HashSet;

pub mod error;
pub use error::KindsError;

/// Kind of the Scope that carries global attributes. Always registered.
pub const GLOBAL_KIND: &str = "global";

// Kind Plugin
pub trait KindsPlugin {
    fn build(&self, kinds: &mut ScopeKinds);
}

/// The closed set of Scope Kinds the application knows how to materialize.
///
/// Scope-identity events naming a Kind outside this table are dropped.
pub struct ScopeKinds {
    kinds: Vec<String>,
    index: HashSet<String>,
    locked: bool,
}

impl Default for ScopeKinds {
    fn default() -> Self {
        let mut kinds = Self {
            kinds: Vec::new(),
            index: HashSet::new(),
            locked: false,
        };
        kinds.insert(GLOBAL_KIND);
        kinds
    }
}

impl ScopeKinds {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_plugin<P: KindsPlugin>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    pub fn add_kind(&mut self, kind: &str) -> &mut Self {
        if let Err(err) = self.try_add_kind(kind) {
            panic!("{}", err);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_plugin<P: KindsPlugin>(&mut self, plugin: P) -> Result<&mut Self, KindsError> {
        self.try_check_lock()?;
        plugin.build(self);
        Ok(self)
    }

    pub fn try_add_kind(&mut self, kind: &str) -> Result<&mut Self, KindsError> {
        self.try_check_lock()?;
        if kind.is_empty() {
            return Err(KindsError::EmptyKind);
        }
        if self.index.contains(kind) {
            return Err(KindsError::DuplicateKind {
                kind: kind.to_string(),
            });
        }
        self.insert(kind);
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), KindsError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if the table is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), KindsError> {
        if self.locked {
            Err(KindsError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if the table is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Kind table already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }

    // Lookups

    pub fn contains(&self, kind: &str) -> bool {
        self.index.contains(kind)
    }

    /// Kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn insert(&mut self, kind: &str) {
        self.kinds.push(kind.to_string());
        self.index.insert(kind.to_string());
    }
}
