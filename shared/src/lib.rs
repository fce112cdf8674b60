//! # Empirica Shared
//! Change-event model and the reconciled Scope world shared by the admin
//! runtime and its tests.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod change;
mod kinds;
mod subscriptions;
mod world;

pub use change::{
    AttributeChange, AttributeNode, ChangeEvent, ChangeMessage, PeerChange, ScopeIdent, Step,
    StepChange, StepState, Transition,
};
pub use kinds::{error::KindsError, KindsPlugin, ScopeKinds, GLOBAL_KIND};
pub use subscriptions::{
    KeyValue, ScopeSubscription, ScopedFilter, SubscriptionDelta, SubscriptionSet,
};
pub use world::{
    attributes::{
        attribute::{Attribute, MAX_VECTOR_LEN},
        attribute_store::{AttributeCommit, AttributeStore},
        error::AttributeError,
        options::{AttributeOptions, SetAttributeInput},
    },
    scope_world::ScopeWorld,
    scopes::{
        error::ScopeError,
        scope_record::ScopeRecord,
        scope_ref::{ScopeRef, ScopeView},
        scope_store::{ScopeCommit, ScopeStore},
    },
    steps::{StepRecord, StepStore},
    world_events::{
        AttributeUpdate, AttributeUpdateEvent, ScopeRemovalEvent, ScopeUpdate, ScopeUpdateEvent,
        WorldEvent, WorldEvents,
    },
};
