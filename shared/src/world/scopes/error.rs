use thiserror::Error;

/// Errors raised while materializing Scopes from the change stream
///
/// Every variant is an integrity fault: the offending event is dropped and the
/// stream keeps flowing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// First sighting of a Scope without a Kind
    #[error("Scope {scope_id} arrived without a kind")]
    MissingKind { scope_id: String },

    /// First sighting of a Scope whose Kind is not in the Kind table
    #[error("Scope {scope_id} has unknown kind: {kind}")]
    UnknownKind { scope_id: String, kind: String },

    /// Removal of a Scope that was never materialized
    #[error("Missing scope on removal: {scope_id}")]
    MissingOnRemoval { scope_id: String },
}
