use thiserror::Error;

/// Integrity faults detected while materializing Attributes
///
/// These come from malformed change data. The world logs them and drops the
/// offending change; they never stop the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// Attribute change carries neither a node ID nor an embedded node
    #[error("Attribute {attribute_id} (key '{key}') has no owning node ID")]
    MissingNodeId { attribute_id: String, key: String },

    /// Vector attribute change without an index
    #[error("Vector attribute {attribute_id} (key '{key}') is missing its index")]
    VectorMissingIndex { attribute_id: String, key: String },

    /// Vector attribute change whose index is past the supported length
    #[error("Vector attribute {attribute_id} (key '{key}') has index {index}, limit is {limit}")]
    VectorIndexOutOfRange {
        attribute_id: String,
        key: String,
        index: usize,
        limit: usize,
    },

    /// Attribute hangs off a node that is not a Scope
    #[error("Attribute {attribute_id} belongs to non-scope node {node_id} ({typename})")]
    NonScopeNode {
        attribute_id: String,
        node_id: String,
        typename: String,
    },
}
