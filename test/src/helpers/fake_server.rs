use std::collections::{HashSet, VecDeque};

use log::debug;
use serde_json::Value;

use empirica_admin::{
    AddGroupInput, AddScopeInput, AddStepInput, AdminTransport, CreatedScope, LinkInput,
    LinkPayload, TransitionInput, TransportError,
};
use empirica_shared::{
    AttributeChange, AttributeNode, ChangeEvent, ChangeMessage, PeerChange, ScopeIdent,
    ScopedFilter, SetAttributeInput, Step, StepState, Transition, GLOBAL_KIND,
};

/// In-memory stand-in for the admin service.
///
/// Keeps the latest write of every Attribute, answers fetches, and pushes
/// later changes to the Scopes a session fetched. Writes coming back from the
/// session are echoed on the push stream, as the service does.
pub struct FakeServer {
    connected: bool,
    echo_writes: bool,
    next_id: u64,
    scopes: Vec<ScopeIdent>,
    attributes: Vec<AttributeChange>,
    filters: Vec<ScopedFilter>,
    peers: Vec<PeerChange>,
    peers_subscribed: bool,
    transition_steps: HashSet<String>,
    steps: Vec<Step>,
    inbox: VecDeque<ChangeMessage>,
    calls: Vec<String>,
    set_batches: Vec<Vec<SetAttributeInput>>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    /// A server holding only the global Scope
    pub fn new() -> Self {
        let mut server = Self {
            connected: true,
            echo_writes: true,
            next_id: 0,
            scopes: Vec::new(),
            attributes: Vec::new(),
            filters: Vec::new(),
            peers: Vec::new(),
            peers_subscribed: false,
            transition_steps: HashSet::new(),
            steps: Vec::new(),
            inbox: VecDeque::new(),
            calls: Vec::new(),
            set_batches: Vec::new(),
        };
        server.seed_scope("global-1", GLOBAL_KIND);
        server
    }

    /// Stops echoing the session's own writes back on the push stream
    pub fn without_echo(mut self) -> Self {
        self.echo_writes = false;
        self
    }

    // Server-side state

    pub fn seed_scope(&mut self, id: &str, kind: &str) -> &mut Self {
        self.scopes.push(ScopeIdent::new(id, kind));
        self
    }

    pub fn seed_attribute(&mut self, scope_id: &str, key: &str, value: &Value) -> &mut Self {
        self.write(scope_id, key, value.to_string(), None);
        self
    }

    /// Creates a Scope and pushes it to sessions watching it
    pub fn push_scope(&mut self, id: &str, kind: &str) {
        let ident = ScopeIdent::new(id, kind);
        self.scopes.push(ident.clone());
        if self.is_watched(&ident) {
            self.inbox
                .push_back(ChangeMessage::added(ChangeEvent::Scope(ident)));
            self.inbox.push_back(ChangeMessage::Done);
        }
    }

    /// Writes an Attribute as another participant would, and pushes it
    pub fn push_attribute(&mut self, scope_id: &str, key: &str, value: &Value) -> Option<AttributeChange> {
        let change = self.write(scope_id, key, value.to_string(), None)?;
        self.push_changes(vec![change.clone()]);
        Some(change)
    }

    /// Pushes raw messages, bypassing subscriptions
    pub fn push_raw(&mut self, messages: impl IntoIterator<Item = ChangeMessage>) {
        self.inbox.extend(messages);
    }

    pub fn connect_peer(&mut self, id: &str, identifier: &str) {
        let peer = PeerChange {
            id: id.to_string(),
            identifier: identifier.to_string(),
        };
        self.peers.push(peer.clone());
        if self.peers_subscribed {
            self.inbox
                .push_back(ChangeMessage::added(ChangeEvent::Peer(peer)));
        }
    }

    pub fn disconnect_peer(&mut self, id: &str) {
        let Some(position) = self.peers.iter().position(|peer| peer.id == id) else {
            return;
        };
        let peer = self.peers.remove(position);
        if self.peers_subscribed {
            self.inbox
                .push_back(ChangeMessage::removed(ChangeEvent::Peer(peer)));
        }
    }

    /// Transitions a Step as the timer service would
    pub fn push_transition(&mut self, step_id: &str, from: StepState, to: StepState) {
        let transition = self.transition(step_id, from, to);
        if self.transition_steps.contains(step_id) {
            self.inbox
                .push_back(ChangeMessage::added(ChangeEvent::Transition(transition)));
        }
    }

    /// Drops the connection: every further call fails with `NotConnected`
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Restores the connection. Subscriptions of the old session are gone.
    pub fn reconnect(&mut self) {
        self.connected = true;
        self.filters.clear();
        self.peers_subscribed = false;
        self.transition_steps.clear();
        self.inbox.clear();
    }

    // Inspection

    /// Names of the transport calls received, in order
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    /// Every `set_attributes` request, as received
    pub fn set_batches(&self) -> &[Vec<SetAttributeInput>] {
        &self.set_batches
    }

    pub fn filters(&self) -> &[ScopedFilter] {
        &self.filters
    }

    pub fn value(&self, scope_id: &str, key: &str) -> Option<Value> {
        self.attributes
            .iter()
            .find(|change| change.owner_id() == Some(scope_id) && change.key == key)
            .and_then(|change| change.val.as_deref())
            .and_then(|val| serde_json::from_str(val).ok())
    }

    pub fn scopes_of_kind(&self, kind: &str) -> Vec<&ScopeIdent> {
        self.scopes
            .iter()
            .filter(|scope| scope.kind() == Some(kind))
            .collect()
    }

    // Internals

    fn call(&mut self, name: &str) -> Result<(), TransportError> {
        self.calls.push(name.to_string());
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn write(&mut self, scope_id: &str, key: &str, val: String, index: Option<usize>) -> Option<AttributeChange> {
        let ident = self.scopes.iter().find(|scope| scope.id == scope_id)?.clone();
        let id = self.next_id("attr");

        let existing = self.attributes.iter().position(|change| {
            change.owner_id() == Some(scope_id) && change.key == key && change.index == index
        });
        let version = existing
            .map(|position| self.attributes[position].version + 1)
            .unwrap_or(1);

        let change = AttributeChange {
            id,
            node_id: Some(scope_id.to_string()),
            node: Some(AttributeNode::Scope(ident)),
            key: key.to_string(),
            val: Some(val),
            index,
            vector: index.is_some(),
            version,
        };

        match existing {
            Some(position) => self.attributes[position] = change.clone(),
            None => self.attributes.push(change.clone()),
        }
        debug!("fake server: wrote {}.{} v{}", scope_id, key, version);
        Some(change)
    }

    fn write_input(&mut self, scope_id: &str, input: &SetAttributeInput) -> Option<AttributeChange> {
        let index = if input.append {
            Some(
                self.attributes
                    .iter()
                    .filter(|change| {
                        change.owner_id() == Some(scope_id) && change.key == input.key
                    })
                    .count(),
            )
        } else if input.vector {
            Some(input.index.unwrap_or(0))
        } else {
            None
        };
        self.write(scope_id, &input.key, input.val.clone(), index)
    }

    fn push_changes(&mut self, changes: Vec<AttributeChange>) {
        let watched: Vec<AttributeChange> = changes
            .into_iter()
            .filter(|change| {
                self.scopes
                    .iter()
                    .any(|scope| Some(scope.id.as_str()) == change.owner_id() && self.is_watched(scope))
            })
            .collect();
        if watched.is_empty() {
            return;
        }
        for change in watched {
            self.inbox
                .push_back(ChangeMessage::added(ChangeEvent::Attribute(change)));
        }
        self.inbox.push_back(ChangeMessage::Done);
    }

    fn is_watched(&self, scope: &ScopeIdent) -> bool {
        self.filters.iter().any(|filter| self.matches(filter, scope))
    }

    fn matches(&self, filter: &ScopedFilter, scope: &ScopeIdent) -> bool {
        let owned = |change: &&AttributeChange| change.owner_id() == Some(scope.id.as_str());
        match filter {
            ScopedFilter::Ids(ids) => ids.contains(&scope.id),
            ScopedFilter::Kinds(kinds) => scope
                .kind()
                .map_or(false, |kind| kinds.iter().any(|k| k == kind)),
            ScopedFilter::Names(names) => scope
                .name
                .as_ref()
                .map_or(false, |name| names.contains(name)),
            ScopedFilter::Keys(keys) => self
                .attributes
                .iter()
                .filter(owned)
                .any(|change| keys.contains(&change.key)),
            ScopedFilter::Kvs(kvs) => kvs.iter().any(|kv| {
                self.attributes
                    .iter()
                    .filter(owned)
                    .any(|change| change.key == kv.key && change.val.as_deref() == Some(kv.val.as_str()))
            }),
        }
    }

    fn transition(&mut self, step_id: &str, from: StepState, to: StepState) -> Transition {
        let duration = match self.steps.iter_mut().find(|step| step.id == step_id) {
            Some(step) => {
                step.state = to;
                step.duration
            }
            None => 0,
        };
        Transition {
            id: self.next_id("transition"),
            from,
            to,
            step: Step {
                id: step_id.to_string(),
                state: to,
                duration,
            },
        }
    }
}

impl AdminTransport for FakeServer {
    fn fetch_scoped(&mut self, filter: &ScopedFilter) -> Result<Vec<ChangeMessage>, TransportError> {
        self.call("fetch_scoped")?;
        self.filters.push(filter.clone());

        let mut messages = Vec::new();
        for scope in self.scopes.iter().filter(|scope| self.matches(filter, scope)) {
            messages.push(ChangeMessage::added(ChangeEvent::Scope(scope.clone())));
            for change in self
                .attributes
                .iter()
                .filter(|change| change.owner_id() == Some(scope.id.as_str()))
            {
                messages.push(ChangeMessage::added(ChangeEvent::Attribute(change.clone())));
            }
        }
        messages.push(ChangeMessage::Done);
        Ok(messages)
    }

    fn subscribe_peers(&mut self) -> Result<Vec<PeerChange>, TransportError> {
        self.call("subscribe_peers")?;
        self.peers_subscribed = true;
        Ok(self.peers.clone())
    }

    fn subscribe_transitions(&mut self, step_id: &str) -> Result<(), TransportError> {
        self.call("subscribe_transitions")?;
        self.transition_steps.insert(step_id.to_string());
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<ChangeMessage>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(self.inbox.pop_front())
    }

    fn create_scopes(&mut self, inputs: &[AddScopeInput]) -> Result<Vec<CreatedScope>, TransportError> {
        self.call("create_scopes")?;

        let mut created = Vec::new();
        for input in inputs {
            let id = self.next_id(&input.kind);
            let scope = ScopeIdent {
                id: id.clone(),
                kind: Some(input.kind.clone()),
                name: input.name.clone(),
            };
            self.scopes.push(scope.clone());

            let attributes: Vec<AttributeChange> = input
                .attributes
                .iter()
                .filter_map(|attribute| self.write_input(&id, attribute))
                .collect();

            if self.echo_writes && self.is_watched(&scope) {
                self.inbox
                    .push_back(ChangeMessage::added(ChangeEvent::Scope(scope.clone())));
                for change in &attributes {
                    self.inbox
                        .push_back(ChangeMessage::added(ChangeEvent::Attribute(change.clone())));
                }
                self.inbox.push_back(ChangeMessage::Done);
            }

            created.push(CreatedScope { scope, attributes });
        }
        Ok(created)
    }

    fn set_attributes(
        &mut self,
        inputs: &[SetAttributeInput],
    ) -> Result<Vec<AttributeChange>, TransportError> {
        self.call("set_attributes")?;
        self.set_batches.push(inputs.to_vec());

        let mut changes = Vec::new();
        for input in inputs {
            let Some(node_id) = input.node_id.as_deref() else {
                return Err(TransportError::Rejected {
                    call: "set_attributes",
                    reason: format!("missing node ID for {}", input.key),
                });
            };
            if let Some(change) = self.write_input(node_id, input) {
                changes.push(change);
            }
        }

        if self.echo_writes {
            self.push_changes(changes.clone());
        }
        Ok(changes)
    }

    fn create_groups(&mut self, inputs: &[AddGroupInput]) -> Result<Vec<String>, TransportError> {
        self.call("create_groups")?;
        Ok(inputs.iter().map(|_| self.next_id("group")).collect())
    }

    fn link_peers(&mut self, input: &LinkInput) -> Result<LinkPayload, TransportError> {
        self.call("link_peers")?;
        Ok(LinkPayload {
            node_ids: input.node_ids.clone(),
            participant_ids: input.participant_ids.clone(),
        })
    }

    fn create_steps(&mut self, inputs: &[AddStepInput]) -> Result<Vec<Step>, TransportError> {
        self.call("create_steps")?;
        let mut steps = Vec::new();
        for input in inputs {
            let step = Step {
                id: self.next_id("step"),
                state: StepState::Created,
                duration: input.duration,
            };
            self.steps.push(step.clone());
            steps.push(step);
        }
        Ok(steps)
    }

    fn add_transition(&mut self, input: &TransitionInput) -> Result<Transition, TransportError> {
        self.call("add_transition")?;
        let transition = self.transition(&input.node_id, input.from, input.to);
        if self.transition_steps.contains(&input.node_id) {
            self.inbox
                .push_back(ChangeMessage::added(ChangeEvent::Transition(transition.clone())));
        }
        Ok(transition)
    }
}
