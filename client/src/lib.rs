//! # Empirica Admin
//! Keeps a local, consistent view of an experiment's Scopes and Attributes
//! from a server change stream, and runs registered listener callbacks on
//! every committed change.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use empirica_shared::{
    AttributeChange, AttributeNode, ChangeEvent, ChangeMessage, KindsError, KindsPlugin,
    PeerChange, ScopeIdent, ScopeKinds, ScopeRef, ScopeSubscription, ScopeView, ScopeWorld,
    ScopedFilter, SetAttributeInput, Step, StepRecord, StepState, Transition, GLOBAL_KIND,
};

mod cake;
mod config;
mod connection;
mod context;
mod events;
mod listeners;
mod peers;
mod pending;
mod runloop;
mod transport;

pub use cake::{FeedState, Selector};
pub use config::AdminConfig;
pub use connection::{AdminContext, ConnectionState, RunloopState};
pub use context::EventContext;
pub use events::{AttributeEvent, CallbackResult, ExternalEvent, ExternalPayload, KindEvent};
pub use listeners::{ListenersCollector, Placed, Placement, RegistrationError};
pub use peers::PeerRegistry;
pub use pending::Reply;
pub use runloop::Runloop;
pub use transport::{
    AddGroupInput, AddScopeInput, AddStepInput, AdminTransport, CreatedScope, LinkInput,
    LinkPayload, TransitionInput, TransportError,
};
