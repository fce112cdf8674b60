use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Write-time options for an Attribute. Enforcement is the server's job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOptions {
    /// Not visible to other participants
    pub private: bool,
    /// Not updatable by other participants
    pub protected: bool,
    /// Cannot be updated once set
    pub immutable: bool,
    /// Value is an indexed vector
    pub vector: bool,
    /// Vector index to write at
    pub index: Option<usize>,
    /// Append to the vector
    pub append: bool,
}

/// A pending attribute write, as sent to the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAttributeInput {
    pub node_id: Option<String>,
    pub key: String,
    pub val: String,
    pub private: bool,
    pub protected: bool,
    pub immutable: bool,
    pub vector: bool,
    pub index: Option<usize>,
    pub append: bool,
}

impl SetAttributeInput {
    pub fn new(node_id: &str, key: &str, value: &Value) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            key: key.to_string(),
            val: value.to_string(),
            private: false,
            protected: false,
            immutable: false,
            vector: false,
            index: None,
            append: false,
        }
    }

    /// Write with no owner yet, as carried inside a Scope creation request
    pub fn unbound(key: &str, value: &Value) -> Self {
        Self {
            node_id: None,
            ..Self::new("", key, value)
        }
    }

    pub fn with_options(mut self, options: &AttributeOptions) -> Self {
        self.private = options.private;
        self.protected = options.protected;
        self.immutable = options.immutable;
        self.vector = options.vector || options.append || options.index.is_some();
        self.index = options.index;
        self.append = options.append;
        self
    }
}
