use serde::{Deserialize, Serialize};

/// Identity of a Scope as carried by the change stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeIdent {
    pub id: String,
    pub kind: Option<String>,
    pub name: Option<String>,
}

impl ScopeIdent {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: Some(kind.to_string()),
            name: None,
        }
    }

    pub fn named(id: &str, kind: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: Some(kind.to_string()),
            name: Some(name.to_string()),
        }
    }

    /// Kind, if present and non-empty
    pub fn kind(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some("") | None => None,
            Some(kind) => Some(kind),
        }
    }
}

/// The node an Attribute hangs off. Only Scopes are materialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeNode {
    Scope(ScopeIdent),
    Other { id: String, typename: String },
}

impl AttributeNode {
    pub fn id(&self) -> &str {
        match self {
            AttributeNode::Scope(ident) => &ident.id,
            AttributeNode::Other { id, .. } => id,
        }
    }
}

/// One versioned write to an Attribute.
///
/// `val` is the JSON-encoded value; it is decoded lazily on read. `id` changes
/// with every version the server assigns, so `(id, version)` identifies a
/// specific write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub id: String,
    pub node_id: Option<String>,
    pub node: Option<AttributeNode>,
    pub key: String,
    pub val: Option<String>,
    pub index: Option<usize>,
    pub vector: bool,
    pub version: u64,
}

impl AttributeChange {
    /// ID of the owning node, taken from `node_id` or else from the embedded node.
    pub fn owner_id(&self) -> Option<&str> {
        if let Some(node_id) = self.node_id.as_deref() {
            if !node_id.is_empty() {
                return Some(node_id);
            }
        }
        match self.node.as_ref().map(AttributeNode::id) {
            Some("") | None => None,
            Some(id) => Some(id),
        }
    }

    /// Kind of the owning Scope, when the change embeds it.
    pub fn node_kind(&self) -> Option<&str> {
        match &self.node {
            Some(AttributeNode::Scope(ident)) => ident.kind(),
            _ => None,
        }
    }

    pub fn is_same_write(&self, other: &AttributeChange) -> bool {
        self.id == other.id && self.version == other.version
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerChange {
    pub id: String,
    pub identifier: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepState {
    Created,
    Running,
    Paused,
    Ended,
    Terminated,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepChange {
    pub id: String,
    pub running: bool,
    pub elapsed_seconds: Option<u64>,
    pub remaining_seconds: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub state: StepState,
    pub duration: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub from: StepState,
    pub to: StepState,
    pub step: Step,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Scope(ScopeIdent),
    Attribute(AttributeChange),
    Peer(PeerChange),
    Step(StepChange),
    Transition(Transition),
}

/// A message on the change stream: either a change, or the batch boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeMessage {
    Change { event: ChangeEvent, removed: bool },
    Done,
}

impl ChangeMessage {
    pub fn added(event: ChangeEvent) -> Self {
        Self::Change {
            event,
            removed: false,
        }
    }

    pub fn removed(event: ChangeEvent) -> Self {
        Self::Change {
            event,
            removed: true,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ChangeMessage::Done)
    }
}
