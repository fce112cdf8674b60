use serde::{Deserialize, Serialize};
use serde_json::Value;

use empirica_shared::{AttributeChange, ScopeIdent, SetAttributeInput, StepState};

/// Request to create one Scope with initial Attributes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddScopeInput {
    pub kind: String,
    pub name: Option<String>,
    pub attributes: Vec<SetAttributeInput>,
}

impl AddScopeInput {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: None,
            attributes: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn attribute(mut self, key: &str, value: &Value) -> Self {
        self.attributes.push(SetAttributeInput::unbound(key, value));
        self
    }
}

/// A Scope created by the service, with the Attributes it was created with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedScope {
    pub scope: ScopeIdent,
    pub attributes: Vec<AttributeChange>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddGroupInput {
    pub participants: Vec<String>,
}

/// Links (or unlinks) peers to nodes so they receive those nodes' updates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInput {
    pub node_ids: Vec<String>,
    pub participant_ids: Vec<String>,
    pub link: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPayload {
    pub node_ids: Vec<String>,
    pub participant_ids: Vec<String>,
}

/// Request to create a Step (timer) lasting `duration` seconds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStepInput {
    pub duration: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInput {
    pub node_id: String,
    pub from: StepState,
    pub to: StepState,
    pub cause: Option<String>,
}
