use log::warn;
use serde_json::Value;

use empirica_shared::{
    PeerChange, ScopeRef, ScopeSubscription, ScopeView, ScopeWorld, SetAttributeInput, Step,
    StepRecord, SubscriptionSet, Transition,
};

use crate::{
    events::CallbackResult,
    peers::PeerRegistry,
    pending::{PendingChange, PendingChanges},
    transport::{AddGroupInput, AddScopeInput, AddStepInput, CreatedScope, LinkInput, LinkPayload, TransitionInput},
};

/// Handed to every listener callback.
///
/// Gives read access to the materialized Scopes, lets the callback declare
/// more interest, and queues mutations. Nothing declared here takes effect
/// before the callback returns.
pub struct EventContext<'a> {
    world: &'a ScopeWorld,
    subs: &'a mut SubscriptionSet,
    pending: &'a mut PendingChanges,
    peers: &'a PeerRegistry,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        world: &'a ScopeWorld,
        subs: &'a mut SubscriptionSet,
        pending: &'a mut PendingChanges,
        peers: &'a PeerRegistry,
    ) -> Self {
        Self {
            world,
            subs,
            pending,
            peers,
        }
    }

    // Reads

    pub fn world(&self) -> &'a ScopeWorld {
        self.world
    }

    pub fn scope(&self, id: &str) -> Option<ScopeRef<'a>> {
        self.world.scope(id)
    }

    /// Scope by ID, if it is of the view's Kind
    pub fn scope_as<V: ScopeView<'a>>(&self, id: &str) -> Option<V> {
        self.scope(id).and_then(ScopeRef::cast)
    }

    pub fn scopes_by_kind(&self, kind: &str) -> Vec<ScopeRef<'a>> {
        self.world.scopes_by_kind(kind).collect()
    }

    pub fn scopes_by_kind_id(&self, kind: &str, id: &str) -> Option<ScopeRef<'a>> {
        self.world
            .scopes_by_kind(kind)
            .find(|scope| scope.id() == id)
    }

    pub fn scopes_by_kind_matching(&self, kind: &str, key: &str, value: &Value) -> Vec<ScopeRef<'a>> {
        self.world
            .scopes_by_kind(kind)
            .filter(|scope| scope.get(key).as_ref() == Some(value))
            .collect()
    }

    pub fn global(&self, key: &str) -> Option<Value> {
        self.world.global(key)
    }

    pub fn set_global(&self, key: &str, value: &Value) {
        match self.world.global_scope() {
            Some(global) => self.world.write(SetAttributeInput::new(global.id(), key, value)),
            None => warn!("context: no global scope, dropping global {}", key),
        }
    }

    pub fn step(&self, id: &str) -> Option<&'a StepRecord> {
        self.world.step(id)
    }

    /// Currently connected peers
    pub fn peers(&self) -> impl Iterator<Item = &'a PeerChange> {
        self.peers.iter()
    }

    // Interest

    pub fn scope_sub(&mut self, subscription: ScopeSubscription) {
        self.subs.add_scope(subscription);
    }

    pub fn peers_sub(&mut self) {
        self.subs.add_peer_events();
    }

    pub fn transitions_sub(&mut self, step_id: &str) {
        self.subs.add_transition_watch(step_id);
    }

    // Mutations

    pub fn add_scopes(&mut self, inputs: Vec<AddScopeInput>) {
        self.pending.push(PendingChange::AddScopes { inputs, reply: None });
    }

    /// Creates Scopes, then runs `reply` once they are in the store
    pub fn add_scopes_then<F>(&mut self, inputs: Vec<AddScopeInput>, reply: F)
    where
        F: FnOnce(&mut EventContext<'_>, &[CreatedScope]) -> CallbackResult + 'static,
    {
        self.pending.push(PendingChange::AddScopes {
            inputs,
            reply: Some(Box::new(reply)),
        });
    }

    pub fn add_groups(&mut self, inputs: Vec<AddGroupInput>) {
        self.pending.push(PendingChange::AddGroups { inputs, reply: None });
    }

    pub fn add_groups_then<F>(&mut self, inputs: Vec<AddGroupInput>, reply: F)
    where
        F: FnOnce(&mut EventContext<'_>, &[String]) -> CallbackResult + 'static,
    {
        self.pending.push(PendingChange::AddGroups {
            inputs,
            reply: Some(Box::new(reply)),
        });
    }

    pub fn link_peers(&mut self, inputs: Vec<LinkInput>) {
        self.pending.push(PendingChange::LinkPeers { inputs, reply: None });
    }

    pub fn link_peers_then<F>(&mut self, inputs: Vec<LinkInput>, reply: F)
    where
        F: FnOnce(&mut EventContext<'_>, &[LinkPayload]) -> CallbackResult + 'static,
    {
        self.pending.push(PendingChange::LinkPeers {
            inputs,
            reply: Some(Box::new(reply)),
        });
    }

    pub fn add_steps(&mut self, inputs: Vec<AddStepInput>) {
        self.pending.push(PendingChange::AddSteps { inputs, reply: None });
    }

    pub fn add_steps_then<F>(&mut self, inputs: Vec<AddStepInput>, reply: F)
    where
        F: FnOnce(&mut EventContext<'_>, &[Step]) -> CallbackResult + 'static,
    {
        self.pending.push(PendingChange::AddSteps {
            inputs,
            reply: Some(Box::new(reply)),
        });
    }

    pub fn add_transitions(&mut self, inputs: Vec<TransitionInput>) {
        self.pending
            .push(PendingChange::AddTransitions { inputs, reply: None });
    }

    pub fn add_transitions_then<F>(&mut self, inputs: Vec<TransitionInput>, reply: F)
    where
        F: FnOnce(&mut EventContext<'_>, &[Transition]) -> CallbackResult + 'static,
    {
        self.pending.push(PendingChange::AddTransitions {
            inputs,
            reply: Some(Box::new(reply)),
        });
    }

    /// Runs `finalizer` once the mutations queued so far have been issued,
    /// then flushes whatever it declares. Finalizers run one per flush, in
    /// the order they were added.
    pub fn add_finalizer<F>(&mut self, finalizer: F)
    where
        F: FnOnce(&mut EventContext<'_>) -> CallbackResult + 'static,
    {
        self.pending.push_finalizer(Box::new(finalizer));
    }
}
