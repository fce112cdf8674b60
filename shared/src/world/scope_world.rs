use std::sync::{mpsc::Sender, Arc};

use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::{
    world::{
        attributes::{
            attribute::Attribute, attribute_store::AttributeStore, error::AttributeError,
            options::SetAttributeInput,
        },
        scopes::{scope_ref::ScopeRef, scope_store::ScopeStore},
        steps::{StepRecord, StepStore},
        world_events::{AttributeUpdate, WorldEvents},
    },
    AttributeChange, AttributeNode, ChangeEvent, ChangeMessage, ScopeIdent, ScopeKinds, Step,
    StepChange, Transition,
};

/// Scopes, Attributes and Steps of one session, reconciled batch by batch.
///
/// Changes are buffered until a `Done` message commits them; a commit yields
/// one [`WorldEvents`] bag carrying the batch sequence number.
pub struct ScopeWorld {
    scopes: ScopeStore,
    attributes: AttributeStore,
    steps: StepStore,
    batch_seq: u64,
    global_scope_id: Option<String>,
    writes: Sender<SetAttributeInput>,
}

impl ScopeWorld {
    pub fn new(kinds: Arc<ScopeKinds>, writes: Sender<SetAttributeInput>) -> Self {
        Self {
            scopes: ScopeStore::new(kinds),
            attributes: AttributeStore::new(),
            steps: StepStore::new(),
            batch_seq: 0,
            global_scope_id: None,
            writes,
        }
    }

    // Incoming

    /// Buffers a change, or commits on `Done`.
    pub fn receive_message(&mut self, message: ChangeMessage) -> Option<WorldEvents> {
        match message {
            ChangeMessage::Done => Some(self.commit()),
            ChangeMessage::Change { event, removed } => {
                match event {
                    ChangeEvent::Scope(ident) => self.apply_scope(ident, removed),
                    ChangeEvent::Attribute(change) => self.apply_attribute(change, removed),
                    ChangeEvent::Step(change) => self.apply_step(change, removed),
                    ChangeEvent::Peer(_) | ChangeEvent::Transition(_) => {
                        debug!("world: ignoring non-scope change");
                    }
                }
                None
            }
        }
    }

    pub fn apply_scope(&mut self, ident: ScopeIdent, removed: bool) {
        if let Err(err) = self.scopes.apply_scope_event(ident, removed) {
            warn!("scopes: {}", err);
        }
    }

    pub fn apply_attribute(&mut self, change: AttributeChange, removed: bool) {
        if let Some(AttributeNode::Other { id, typename }) = &change.node {
            error!(
                "attributes: {}",
                AttributeError::NonScopeNode {
                    attribute_id: change.id.clone(),
                    node_id: id.clone(),
                    typename: typename.clone(),
                }
            );
            return;
        }

        if !removed {
            if let Some(AttributeNode::Scope(ident)) = &change.node {
                if self.scopes.scope(&ident.id).is_none() {
                    self.apply_scope(ident.clone(), false);
                }
            }
        }

        trace!(
            "attributes: {} {}.{} v{}",
            if removed { "remove" } else { "update" },
            change.owner_id().unwrap_or("?"),
            change.key,
            change.version
        );

        if let Err(err) = self.attributes.apply_update(change, removed) {
            error!("attributes: {}", err);
        }
    }

    pub fn apply_step(&mut self, change: StepChange, removed: bool) {
        self.steps.apply_update(change, removed);
    }

    pub fn record_step(&mut self, step: &Step) {
        self.steps.record_step(step);
    }

    pub fn record_transition(&mut self, transition: &Transition) {
        self.steps.record_transition(transition);
    }

    /// Publishes everything buffered since the last commit.
    pub fn commit(&mut self) -> WorldEvents {
        self.batch_seq += 1;
        self.steps.commit();
        let commit = self.scopes.commit(&mut self.attributes);

        let mut events = WorldEvents::new(self.batch_seq);

        for (kind, scope_id) in &commit.updated {
            events.push_scope_update(kind, scope_id);
        }

        for (scope_id, key) in &commit.attributes.changed_attributes {
            let Some(record) = self.scopes.scope(scope_id) else {
                continue;
            };
            if record.is_deleted() {
                continue;
            }
            let Some(attribute) = self.attributes.attribute(scope_id, key) else {
                continue;
            };
            events.push_attribute_update(AttributeUpdate {
                kind: record.kind().to_string(),
                key: key.clone(),
                scope_id: scope_id.clone(),
                attribute_id: attribute.id().map(str::to_string),
                value: attribute.value(),
            });
        }

        for (kind, scope_id) in &commit.removed {
            events.push_scope_removal(kind, scope_id);
        }

        events
    }

    /// Applies and commits a batch the session produced itself, such as the
    /// result of a creation or write call. Changes buffered from the stream
    /// stay buffered until their own `Done`.
    pub fn commit_batch(
        &mut self,
        scopes: Vec<ScopeIdent>,
        attributes: Vec<AttributeChange>,
    ) -> WorldEvents {
        let buffered_scopes = self.scopes.take_pending();
        let buffered_attributes = self.attributes.take_pending();
        let buffered_steps = self.steps.take_pending();

        for ident in scopes {
            self.apply_scope(ident, false);
        }
        for change in attributes {
            self.apply_attribute(change, false);
        }
        let events = self.commit();

        self.scopes.restore_pending(buffered_scopes);
        self.attributes.restore_pending(buffered_attributes);
        self.steps.restore_pending(buffered_steps);
        events
    }

    // Outgoing

    /// Queues an Attribute write for the next flush
    pub fn write(&self, input: SetAttributeInput) {
        if self.writes.send(input).is_err() {
            warn!("world: attribute write dropped, session is closed");
        }
    }

    // Queries

    pub fn batch_seq(&self) -> u64 {
        self.batch_seq
    }

    pub fn has_pending(&self) -> bool {
        self.scopes.has_pending() || self.attributes.has_pending() || self.steps.has_pending()
    }

    pub fn kinds(&self) -> &ScopeKinds {
        self.scopes.kinds()
    }

    pub fn scope(&self, id: &str) -> Option<ScopeRef<'_>> {
        self.scopes
            .scope(id)
            .map(|record| ScopeRef::new(self, record))
    }

    /// Live Scopes of a Kind, in creation order
    pub fn scopes_by_kind<'w>(&'w self, kind: &str) -> impl Iterator<Item = ScopeRef<'w>> + 'w {
        self.scopes
            .by_kind(kind)
            .map(move |record| ScopeRef::new(self, record))
    }

    pub fn get(&self, scope_id: &str, key: &str) -> Option<Value> {
        self.attributes.get(scope_id, key)
    }

    pub fn peek_next(&self, scope_id: &str, key: &str) -> Option<Value> {
        self.attributes.peek_next(scope_id, key)
    }

    pub fn attribute(&self, scope_id: &str, key: &str) -> Option<&Attribute> {
        self.attributes.attribute(scope_id, key)
    }

    pub fn attributes(&self, scope_id: &str) -> impl Iterator<Item = &Attribute> {
        self.attributes.attributes(scope_id)
    }

    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps.get(id)
    }

    pub fn kind_was_updated(&self, kind: &str) -> bool {
        self.scopes.kind_was_updated(kind)
    }

    pub fn scope_was_updated(&self, scope_id: &str) -> bool {
        self.attributes.scope_was_updated(scope_id)
    }

    // Globals

    pub fn set_global_scope(&mut self, id: &str) {
        info!("world: global scope is {}", id);
        self.global_scope_id = Some(id.to_string());
    }

    pub fn global_scope(&self) -> Option<ScopeRef<'_>> {
        self.global_scope_id
            .as_deref()
            .and_then(|id| self.scope(id))
    }

    pub fn global(&self, key: &str) -> Option<Value> {
        self.global_scope_id
            .as_deref()
            .and_then(|id| self.get(id, key))
    }
}
