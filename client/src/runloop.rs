use std::sync::{
    mpsc::{self, Receiver},
    Arc,
};

use log::{debug, info, warn};

use empirica_shared::{
    AttributeChange, ChangeEvent, ChangeMessage, PeerChange, ScopeIdent, ScopeKinds, ScopeWorld,
    SetAttributeInput, SubscriptionDelta, SubscriptionSet,
};

use crate::{
    cake::{Cake, CakeHost, Emission, FeedState, Selector},
    config::AdminConfig,
    context::EventContext,
    events::{ExternalEvent, ExternalPayload},
    listeners::ListenersCollector,
    peers::PeerRegistry,
    pending::{coalesce_writes, PendingChange, PendingChanges},
    transport::{AdminTransport, TransportError},
};

/// Stores, interest and queues of one authenticated session
struct Session {
    config: AdminConfig,
    world: ScopeWorld,
    subs: SubscriptionSet,
    pending: PendingChanges,
    writes: Receiver<SetAttributeInput>,
    queued_writes: Vec<SetAttributeInput>,
    peers: PeerRegistry,
    stopped: bool,
    connection_lost: bool,
}

impl Session {
    fn new(config: AdminConfig, kinds: Arc<ScopeKinds>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            config,
            world: ScopeWorld::new(kinds, sender),
            subs: SubscriptionSet::new(),
            pending: PendingChanges::default(),
            writes: receiver,
            queued_writes: Vec::new(),
            peers: PeerRegistry::new(),
            stopped: false,
            connection_lost: false,
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped || self.connection_lost
    }

    fn collect_writes(&mut self) {
        self.queued_writes.extend(self.writes.try_iter());
    }

    fn has_work(&mut self) -> bool {
        self.collect_writes();
        self.subs.is_dirty()
            || !self.pending.is_empty()
            || !self.queued_writes.is_empty()
    }

    /// Issues everything declared since the last flush: new interest, queued
    /// mutations and Attribute writes, then hands out the next finalizer.
    /// Results go through the stores like any pushed change.
    fn flush(&mut self, transport: &mut dyn AdminTransport) -> Vec<Emission> {
        let mut emissions = Vec::new();
        if self.is_stopped() {
            return emissions;
        }

        if let Some(delta) = self.subs.drain() {
            self.process_delta(delta, transport, &mut emissions);
        }

        for change in self.pending.drain() {
            if self.is_stopped() {
                break;
            }
            self.process_change(change, transport, &mut emissions);
        }

        self.collect_writes();
        if !self.queued_writes.is_empty() && !self.is_stopped() {
            let inputs = coalesce_writes(std::mem::take(&mut self.queued_writes));
            if !inputs.is_empty() {
                match transport.set_attributes(&inputs) {
                    Ok(changes) => self.commit_batch(Vec::new(), changes, &mut emissions),
                    Err(err) => self.transport_failed("set_attributes", err),
                }
            }
        }

        if !self.is_stopped() {
            if let Some(finalizer) = self.pending.next_finalizer() {
                emissions.push(Emission::Reply {
                    label: "finalizer",
                    run: finalizer,
                });
            }
        }

        emissions
    }

    fn process_delta(
        &mut self,
        delta: SubscriptionDelta,
        transport: &mut dyn AdminTransport,
        emissions: &mut Vec<Emission>,
    ) {
        if delta.peers {
            match transport.subscribe_peers() {
                Ok(peers) => {
                    for peer in peers {
                        self.connect_peer(peer, emissions);
                    }
                }
                Err(err) => self.transport_failed("subscribe_peers", err),
            }
        }

        for step_id in &delta.transitions {
            if let Err(err) = transport.subscribe_transitions(step_id) {
                self.transport_failed("subscribe_transitions", err);
            }
        }

        for filter in delta.filters() {
            if self.is_stopped() {
                return;
            }
            debug!("runloop: fetching {:?}", filter);
            match transport.fetch_scoped(&filter) {
                Ok(messages) => {
                    for message in messages {
                        self.receive_message(message, emissions);
                    }
                }
                Err(err) => self.transport_failed("fetch_scoped", err),
            }
        }
    }

    fn process_change(
        &mut self,
        change: PendingChange,
        transport: &mut dyn AdminTransport,
        emissions: &mut Vec<Emission>,
    ) {
        match change {
            PendingChange::AddScopes { inputs, reply } => match transport.create_scopes(&inputs) {
                Ok(created) => {
                    let scopes = created.iter().map(|scope| scope.scope.clone()).collect();
                    let attributes = created
                        .iter()
                        .flat_map(|scope| scope.attributes.iter().cloned())
                        .collect();
                    self.commit_batch(scopes, attributes, emissions);
                    if let Some(reply) = reply {
                        emissions.push(Emission::Reply {
                            label: "add scopes reply",
                            run: Box::new(move |ctx: &mut EventContext<'_>| reply(ctx, &created)),
                        });
                    }
                }
                Err(err) => self.transport_failed("create_scopes", err),
            },
            PendingChange::AddGroups { inputs, reply } => match transport.create_groups(&inputs) {
                Ok(groups) => {
                    if let Some(reply) = reply {
                        emissions.push(Emission::Reply {
                            label: "add groups reply",
                            run: Box::new(move |ctx: &mut EventContext<'_>| reply(ctx, &groups)),
                        });
                    }
                }
                Err(err) => self.transport_failed("create_groups", err),
            },
            PendingChange::LinkPeers { inputs, reply } => {
                let mut links = Vec::new();
                for input in &inputs {
                    match transport.link_peers(input) {
                        Ok(link) => links.push(link),
                        Err(err) => self.transport_failed("link_peers", err),
                    }
                }
                if let Some(reply) = reply {
                    emissions.push(Emission::Reply {
                        label: "link peers reply",
                        run: Box::new(move |ctx: &mut EventContext<'_>| reply(ctx, &links)),
                    });
                }
            }
            PendingChange::AddSteps { inputs, reply } => match transport.create_steps(&inputs) {
                Ok(steps) => {
                    for step in &steps {
                        self.world.record_step(step);
                    }
                    if let Some(reply) = reply {
                        emissions.push(Emission::Reply {
                            label: "add steps reply",
                            run: Box::new(move |ctx: &mut EventContext<'_>| reply(ctx, &steps)),
                        });
                    }
                }
                Err(err) => self.transport_failed("create_steps", err),
            },
            PendingChange::AddTransitions { inputs, reply } => {
                let mut transitions = Vec::new();
                for input in &inputs {
                    match transport.add_transition(input) {
                        Ok(transition) => {
                            self.world.record_transition(&transition);
                            transitions.push(transition);
                        }
                        Err(err) => self.transport_failed("add_transition", err),
                    }
                }
                if let Some(reply) = reply {
                    emissions.push(Emission::Reply {
                        label: "add transitions reply",
                        run: Box::new(move |ctx: &mut EventContext<'_>| reply(ctx, &transitions)),
                    });
                }
            }
        }
    }

    /// Routes one incoming message. Scope, Attribute and Step changes are
    /// batched by the world; peers and transitions are dispatched as they
    /// come.
    fn receive_message(&mut self, message: ChangeMessage, emissions: &mut Vec<Emission>) {
        match message {
            ChangeMessage::Change {
                event: ChangeEvent::Peer(peer),
                removed,
            } => {
                if removed {
                    if let Some(peer) = self.peers.disconnect(&peer.id) {
                        emissions.push(Emission::External {
                            event: ExternalEvent::PeerDisconnected,
                            payload: ExternalPayload::Peer(peer),
                        });
                    }
                } else {
                    self.connect_peer(peer, emissions);
                }
            }
            ChangeMessage::Change {
                event: ChangeEvent::Transition(transition),
                ..
            } => {
                self.world.record_transition(&transition);
                emissions.push(Emission::External {
                    event: ExternalEvent::TransitionAdded,
                    payload: ExternalPayload::Transition(transition),
                });
            }
            message => {
                if let Some(mut events) = self.world.receive_message(message) {
                    debug!("runloop: committed batch {}", events.seq());
                    emissions.extend(Emission::from_world(&mut events));
                }
            }
        }
    }

    fn connect_peer(&mut self, peer: PeerChange, emissions: &mut Vec<Emission>) {
        if self.peers.connect(peer.clone()) {
            emissions.push(Emission::External {
                event: ExternalEvent::PeerConnected,
                payload: ExternalPayload::Peer(peer),
            });
        }
    }

    /// Commits results of the session's own calls as a batch of their own.
    fn commit_batch(
        &mut self,
        scopes: Vec<ScopeIdent>,
        attributes: Vec<AttributeChange>,
        emissions: &mut Vec<Emission>,
    ) {
        let mut events = self.world.commit_batch(scopes, attributes);
        debug!("runloop: committed own batch {}", events.seq());
        emissions.extend(Emission::from_world(&mut events));
    }

    fn transport_failed(&mut self, call: &str, err: TransportError) {
        warn!("runloop: {} failed: {}", call, err);
        if err == TransportError::NotConnected {
            self.connection_lost = true;
        }
    }
}

struct SessionHost<'s> {
    session: &'s mut Session,
    transport: &'s mut dyn AdminTransport,
}

impl CakeHost for SessionHost<'_> {
    fn context(&mut self) -> EventContext<'_> {
        let session = &mut *self.session;
        EventContext::new(
            &session.world,
            &mut session.subs,
            &mut session.pending,
            &session.peers,
        )
    }

    fn post_callback(&mut self) -> Vec<Emission> {
        self.session.flush(self.transport)
    }

    fn is_stopped(&self) -> bool {
        self.session.is_stopped()
    }

    fn world(&self) -> &ScopeWorld {
        &self.session.world
    }

    fn connected_peers(&self) -> Vec<PeerChange> {
        self.session.peers.iter().cloned().collect()
    }
}

/// Orchestrates one session: owns the stores and the dispatch engine, turns
/// declared interest into fetches and feeds every result back through the
/// stores.
pub struct Runloop {
    cake: Cake,
    session: Session,
}

impl Runloop {
    /// Creates the session state and loads the global Scope.
    pub fn start(
        config: AdminConfig,
        kinds: Arc<ScopeKinds>,
        transport: &mut dyn AdminTransport,
    ) -> Result<Self, TransportError> {
        info!("runloop: initializing");

        let mut session = Session::new(config, kinds);
        let global_kind = session.config.global_kind.clone();
        session.subs.add_kinds([global_kind.as_str()]);
        session.flush(transport);

        if session.connection_lost {
            return Err(TransportError::NotConnected);
        }

        let global_id = session
            .world
            .scopes_by_kind(&global_kind)
            .next()
            .map(|scope| scope.id().to_string());
        match global_id {
            Some(id) => session.world.set_global_scope(&id),
            None => warn!("runloop: global scope not found, globals read as absent"),
        }

        let cake = Cake::new(session.config.trace_callbacks);
        info!("runloop: running");
        Ok(Self { cake, session })
    }

    /// Hands a layer to the dispatch engine, then flushes until settled.
    pub fn add_layer(&mut self, listeners: ListenersCollector, transport: &mut dyn AdminTransport) {
        if self.session.is_stopped() {
            warn!("runloop: layer added to a stopped runloop, ignoring");
            return;
        }
        {
            let mut host = SessionHost {
                session: &mut self.session,
                transport: &mut *transport,
            };
            self.cake.add_layer(listeners, &mut host);
        }
        self.settle(transport);
    }

    /// Drains pushed messages from the transport and dispatches them. Returns
    /// how many messages were read.
    pub fn receive(&mut self, transport: &mut dyn AdminTransport) -> Result<usize, TransportError> {
        if self.session.is_stopped() {
            return Ok(0);
        }

        let mut count = 0;
        loop {
            match transport.receive() {
                Ok(Some(message)) => {
                    count += 1;
                    let mut emissions = Vec::new();
                    self.session.receive_message(message, &mut emissions);
                    self.cake.enqueue(emissions);
                }
                Ok(None) => break,
                Err(err) => {
                    self.session.transport_failed("receive", err.clone());
                    return Err(err);
                }
            }
        }

        self.settle(transport);
        Ok(count)
    }

    // Dispatches and flushes until nothing is queued or declared.
    fn settle(&mut self, transport: &mut dyn AdminTransport) {
        let max_rounds = self.session.config.max_flush_rounds;
        for _ in 0..max_rounds {
            if self.session.is_stopped() {
                return;
            }
            let mut host = SessionHost {
                session: &mut self.session,
                transport: &mut *transport,
            };
            self.cake.process(&mut host);
            if !host.session.has_work() {
                return;
            }
            let emissions = host.post_callback();
            self.cake.enqueue(emissions);
        }

        if self.cake.has_queued() || self.session.has_work() {
            warn!(
                "runloop: did not settle after {} flush rounds, yielding",
                max_rounds
            );
        }
    }

    pub fn stop(&mut self) {
        if self.session.stopped {
            return;
        }
        info!("runloop: stopping");
        self.session.stopped = true;
        self.cake.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.session.is_stopped()
    }

    /// Whether a transport call reported the connection gone
    pub fn connection_lost(&self) -> bool {
        self.session.connection_lost
    }

    pub fn world(&self) -> &ScopeWorld {
        &self.session.world
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.session.peers
    }

    pub fn layers(&self) -> usize {
        self.cake.layers()
    }

    pub fn feed_state(&self, selector: &Selector) -> FeedState {
        self.cake.feed_state(selector)
    }
}
