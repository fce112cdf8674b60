use std::default::Default;

use empirica_shared::GLOBAL_KIND;

/// Contains Config properties which will be used by the admin runtime
#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Kind of the Scope holding global Attributes. Fetched when the runloop
    /// starts.
    pub global_kind: String,
    /// Upper bound on flush rounds per tick. Reaching it logs a warning and
    /// yields control back to the caller.
    pub max_flush_rounds: usize,
    /// Whether to log every callback invocation at debug level
    pub trace_callbacks: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            global_kind: GLOBAL_KIND.to_string(),
            max_flush_rounds: 10_000,
            trace_callbacks: true,
        }
    }
}
