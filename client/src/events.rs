use serde_json::Value;

use empirica_shared::{AttributeUpdate, PeerChange, ScopeRef, ScopeUpdate, Transition};

use crate::context::EventContext;

/// What listener callbacks return. Errors are logged and never stop dispatch.
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub(crate) type SimpleCallback = Box<dyn FnMut(&mut EventContext<'_>) -> CallbackResult>;
pub(crate) type KindCallback = Box<dyn FnMut(&mut EventContext<'_>, &KindEvent) -> CallbackResult>;
pub(crate) type AttributeCallback =
    Box<dyn FnMut(&mut EventContext<'_>, &AttributeEvent) -> CallbackResult>;
pub(crate) type ExternalCallback =
    Box<dyn FnMut(&mut EventContext<'_>, &ExternalPayload) -> CallbackResult>;
pub(crate) type ReplyCallback = Box<dyn FnOnce(&mut EventContext<'_>) -> CallbackResult>;

/// A Scope of `kind` arrived, changed or was removed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindEvent {
    pub kind: String,
    pub scope_id: String,
    /// The Scope was removed. It still reads as deleted during this dispatch
    /// round and is evicted at the next commit.
    pub removed: bool,
}

impl KindEvent {
    pub fn scope<'a>(&self, ctx: &EventContext<'a>) -> Option<ScopeRef<'a>> {
        ctx.scope(&self.scope_id)
    }
}

impl From<ScopeUpdate> for KindEvent {
    fn from(update: ScopeUpdate) -> Self {
        Self {
            kind: update.kind,
            scope_id: update.scope_id,
            removed: false,
        }
    }
}

impl KindEvent {
    pub(crate) fn removal(update: ScopeUpdate) -> Self {
        Self {
            removed: true,
            ..update.into()
        }
    }
}

/// An Attribute `key` of a Scope of `kind` received a value
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeEvent {
    pub kind: String,
    pub key: String,
    pub scope_id: String,
    /// Identifier of the write; absent for vector Attributes
    pub attribute_id: Option<String>,
    /// Value at the time the batch was committed
    pub value: Option<Value>,
}

impl AttributeEvent {
    pub fn scope<'a>(&self, ctx: &EventContext<'a>) -> Option<ScopeRef<'a>> {
        ctx.scope(&self.scope_id)
    }
}

impl From<AttributeUpdate> for AttributeEvent {
    fn from(update: AttributeUpdate) -> Self {
        Self {
            kind: update.kind,
            key: update.key,
            scope_id: update.scope_id,
            attribute_id: update.attribute_id,
            value: update.value,
        }
    }
}

/// Events originating outside the Scope graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExternalEvent {
    /// A Transition was added to a watched Step
    TransitionAdded,
    PeerConnected,
    PeerDisconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExternalPayload {
    Transition(Transition),
    Peer(PeerChange),
}

impl ExternalPayload {
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            ExternalPayload::Transition(transition) => Some(transition),
            ExternalPayload::Peer(_) => None,
        }
    }

    pub fn peer(&self) -> Option<&PeerChange> {
        match self {
            ExternalPayload::Peer(peer) => Some(peer),
            ExternalPayload::Transition(_) => None,
        }
    }
}
