use thiserror::Error;

/// Errors that can occur while building the Kind table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KindsError {
    /// Kind table is locked and cannot be modified
    #[error("Kind table is already locked and cannot be modified. ScopeKinds.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// Kind names must be non-empty
    #[error("Cannot register a Kind with an empty name")]
    EmptyKind,

    /// Kind already registered
    #[error("Kind '{kind}' is already registered")]
    DuplicateKind { kind: String },
}
