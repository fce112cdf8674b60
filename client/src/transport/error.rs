use thiserror::Error;

/// Errors returned by an [`AdminTransport`](crate::AdminTransport) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport or the session is down. The runloop stops on this.
    #[error("Transport is not connected")]
    NotConnected,

    /// The service refused the call
    #[error("{call} rejected: {reason}")]
    Rejected { call: &'static str, reason: String },

    /// The service answered with something that could not be interpreted
    #[error("Malformed payload from {call}: {reason}")]
    MalformedPayload { call: &'static str, reason: String },
}
