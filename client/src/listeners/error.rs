use thiserror::Error;

use crate::events::ExternalEvent;

/// Errors raised while collecting listeners. These are wiring mistakes in the
/// caller's code, so the panicking registration methods abort with them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Selector kind is not in the Kind table
    #[error("Unknown kind: {kind}. Add it to the ScopeKinds table before registering listeners for it")]
    UnknownKind { kind: String },

    /// Selector kind is empty
    #[error("Listener kind cannot be empty")]
    EmptyKind,

    /// Attribute listener with an empty key
    #[error("Attribute listener on kind {kind} requires a key")]
    EmptyKey { kind: String },

    /// Only Transition listeners accept a target filter
    #[error("{event:?} listeners do not accept a target filter")]
    TargetNotSupported { event: ExternalEvent },

    /// Target filter present but empty
    #[error("{event:?} listener target cannot be empty")]
    EmptyTarget { event: ExternalEvent },
}
