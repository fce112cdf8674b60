mod emission;
mod feed;

pub(crate) use emission::Emission;
pub use feed::{FeedState, Selector};

use std::{
    any::Any,
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
};

use log::{debug, info, warn};

use empirica_shared::{PeerChange, ScopeWorld};

use crate::{
    context::EventContext,
    events::{
        AttributeCallback, AttributeEvent, CallbackResult, ExternalCallback, ExternalEvent,
        ExternalPayload, KindCallback, KindEvent,
    },
    listeners::{ListenersCollector, Placement},
};
use emission::EmissionQueue;

/// What the dispatch engine needs from the session it runs in
pub(crate) trait CakeHost {
    fn context(&mut self) -> EventContext<'_>;

    /// Runs after every single callback. Returns the emissions produced by
    /// whatever the callback declared or queued.
    fn post_callback(&mut self) -> Vec<Emission>;

    fn is_stopped(&self) -> bool;

    fn world(&self) -> &ScopeWorld;

    fn connected_peers(&self) -> Vec<PeerChange>;
}

struct Registered<C> {
    placement: Placement,
    order: u64,
    since: u64,
    target: Option<String>,
    callback: C,
}

/// Dispatch engine: runs listener callbacks for emissions, one at a time, in
/// placement order, and replays known state to late layers.
pub(crate) struct Cake {
    trace: bool,
    layers: usize,
    next_order: u64,
    kind_listeners: HashMap<String, Vec<Registered<KindCallback>>>,
    attribute_listeners: HashMap<(String, String), Vec<Registered<AttributeCallback>>>,
    external_listeners: HashMap<ExternalEvent, Vec<Registered<ExternalCallback>>>,
    feeds: HashMap<Selector, FeedState>,
    queue: EmissionQueue,
}

impl Cake {
    pub(crate) fn new(trace: bool) -> Self {
        Self {
            trace,
            layers: 0,
            next_order: 0,
            kind_listeners: HashMap::new(),
            attribute_listeners: HashMap::new(),
            external_listeners: HashMap::new(),
            feeds: HashMap::new(),
            queue: EmissionQueue::default(),
        }
    }

    pub(crate) fn enqueue(&mut self, emissions: Vec<Emission>) {
        self.queue.extend(emissions);
    }

    pub(crate) fn has_queued(&self) -> bool {
        self.queue.len() > 0
    }

    pub(crate) fn feed_state(&self, selector: &Selector) -> FeedState {
        self.feeds
            .get(selector)
            .copied()
            .unwrap_or(FeedState::Uninitialized)
    }

    pub(crate) fn layers(&self) -> usize {
        self.layers
    }

    /// Adds a layer: start listeners, registration, replay of known state to
    /// the new listeners, ready listeners, then everything queued meanwhile.
    pub(crate) fn add_layer(&mut self, listeners: ListenersCollector, host: &mut dyn CakeHost) {
        self.layers += 1;
        info!(
            "cake: adding layer {} with {} listeners",
            self.layers,
            listeners.len()
        );

        let ListenersCollector {
            mut starts,
            mut readys,
            kind_listeners,
            attribute_listeners,
            external_listeners,
            ..
        } = listeners;

        starts.sort_by_key(|listener| listener.placement);
        for mut start in starts {
            if host.is_stopped() {
                return;
            }
            run(self.trace, "start", host, &mut self.queue, |ctx| {
                (start.callback)(ctx)
            });
        }

        // Registration

        let since = self.queue.stamp();
        let first_order = self.next_order;

        let mut replay_kinds: Vec<String> = Vec::new();
        for listener in kind_listeners {
            let order = self.bump_order();
            if !replay_kinds.contains(&listener.kind) {
                let state = self
                    .feeds
                    .entry(Selector::Kind(listener.kind.clone()))
                    .or_insert(FeedState::Uninitialized);
                *state = state.add_layer(since);
                replay_kinds.push(listener.kind.clone());
            }
            let registered = self.kind_listeners.entry(listener.kind).or_default();
            registered.push(Registered {
                placement: listener.placement,
                order,
                since,
                target: None,
                callback: listener.callback,
            });
            registered.sort_by_key(|entry| (entry.placement, entry.order));
        }

        let mut replay_attributes: Vec<(String, String)> = Vec::new();
        for listener in attribute_listeners {
            let order = self.bump_order();
            let selector = (listener.kind, listener.key);
            if !replay_attributes.contains(&selector) {
                let state = self
                    .feeds
                    .entry(Selector::Attribute(selector.0.clone(), selector.1.clone()))
                    .or_insert(FeedState::Uninitialized);
                *state = state.add_layer(since);
                replay_attributes.push(selector.clone());
            }
            let registered = self.attribute_listeners.entry(selector).or_default();
            registered.push(Registered {
                placement: listener.placement,
                order,
                since,
                target: None,
                callback: listener.callback,
            });
            registered.sort_by_key(|entry| (entry.placement, entry.order));
        }

        let mut replay_peers = false;
        for listener in external_listeners {
            let order = self.bump_order();
            replay_peers |= listener.event == ExternalEvent::PeerConnected;
            let registered = self.external_listeners.entry(listener.event).or_default();
            registered.push(Registered {
                placement: listener.placement,
                order,
                since,
                target: listener.target,
                callback: listener.callback,
            });
            registered.sort_by_key(|entry| (entry.placement, entry.order));
        }

        // Replay, against a snapshot taken before any replayed callback runs

        let world = host.world();
        let kind_replay: Vec<KindEvent> = replay_kinds
            .iter()
            .flat_map(|kind| {
                world.scopes_by_kind(kind).map(move |scope| KindEvent {
                    kind: kind.clone(),
                    scope_id: scope.id().to_string(),
                    removed: false,
                })
            })
            .collect();
        let attribute_replay: Vec<AttributeEvent> = replay_attributes
            .iter()
            .flat_map(|(kind, key)| {
                world.scopes_by_kind(kind).filter_map(move |scope| {
                    let attribute = scope.attribute(key)?;
                    let value = attribute.value()?;
                    Some(AttributeEvent {
                        kind: kind.clone(),
                        key: key.clone(),
                        scope_id: scope.id().to_string(),
                        attribute_id: attribute.id().map(str::to_string),
                        value: Some(value),
                    })
                })
            })
            .collect();
        let peer_replay = if replay_peers {
            host.connected_peers()
        } else {
            Vec::new()
        };

        for event in kind_replay {
            let Some(listeners) = self.kind_listeners.get_mut(&event.kind) else {
                continue;
            };
            let label = format!("replay scope {}", event.kind);
            for listener in listeners
                .iter_mut()
                .filter(|listener| listener.order >= first_order)
            {
                if host.is_stopped() {
                    info!("cake: replay aborted, runloop stopped");
                    return;
                }
                run(self.trace, &label, host, &mut self.queue, |ctx| {
                    (listener.callback)(ctx, &event)
                });
            }
        }

        for event in attribute_replay {
            let selector = (event.kind.clone(), event.key.clone());
            let Some(listeners) = self.attribute_listeners.get_mut(&selector) else {
                continue;
            };
            let label = format!("replay attribute {}.{}", event.kind, event.key);
            for listener in listeners
                .iter_mut()
                .filter(|listener| listener.order >= first_order)
            {
                if host.is_stopped() {
                    info!("cake: replay aborted, runloop stopped");
                    return;
                }
                run(self.trace, &label, host, &mut self.queue, |ctx| {
                    (listener.callback)(ctx, &event)
                });
            }
        }

        for peer in peer_replay {
            let Some(listeners) = self.external_listeners.get_mut(&ExternalEvent::PeerConnected)
            else {
                continue;
            };
            let payload = ExternalPayload::Peer(peer);
            for listener in listeners
                .iter_mut()
                .filter(|listener| listener.order >= first_order)
            {
                if host.is_stopped() {
                    info!("cake: replay aborted, runloop stopped");
                    return;
                }
                run(self.trace, "replay connected", host, &mut self.queue, |ctx| {
                    (listener.callback)(ctx, &payload)
                });
            }
        }

        readys.sort_by_key(|listener| listener.placement);
        for mut ready in readys {
            if host.is_stopped() {
                return;
            }
            run(self.trace, "ready", host, &mut self.queue, |ctx| {
                (ready.callback)(ctx)
            });
        }

        self.process(host);
    }

    /// Dispatches queued emissions until the queue is empty
    pub(crate) fn process(&mut self, host: &mut dyn CakeHost) {
        while let Some((stamp, emission)) = self.queue.pop() {
            if host.is_stopped() {
                self.queue.clear();
                return;
            }
            self.dispatch(stamp, emission, host);
        }
    }

    fn dispatch(&mut self, stamp: u64, emission: Emission, host: &mut dyn CakeHost) {
        match emission {
            Emission::Kind(event) => {
                if let Some(state) = self.feeds.get_mut(&Selector::Kind(event.kind.clone())) {
                    *state = state.observe(stamp);
                }
                let Some(listeners) = self.kind_listeners.get_mut(&event.kind) else {
                    return;
                };
                let label = format!("scope {}", event.kind);
                for listener in listeners.iter_mut() {
                    if stamp <= listener.since {
                        continue;
                    }
                    if host.is_stopped() {
                        return;
                    }
                    run(self.trace, &label, host, &mut self.queue, |ctx| {
                        (listener.callback)(ctx, &event)
                    });
                }
            }
            Emission::Attribute(event) => {
                let selector = (event.kind.clone(), event.key.clone());
                if let Some(state) = self
                    .feeds
                    .get_mut(&Selector::Attribute(selector.0.clone(), selector.1.clone()))
                {
                    *state = state.observe(stamp);
                }
                let Some(listeners) = self.attribute_listeners.get_mut(&selector) else {
                    return;
                };
                let label = format!("attribute {}.{}", event.kind, event.key);
                for listener in listeners.iter_mut() {
                    if stamp <= listener.since {
                        continue;
                    }
                    if host.is_stopped() {
                        return;
                    }
                    run(self.trace, &label, host, &mut self.queue, |ctx| {
                        (listener.callback)(ctx, &event)
                    });
                }
            }
            Emission::External { event, payload } => {
                let Some(listeners) = self.external_listeners.get_mut(&event) else {
                    return;
                };
                let label = format!("{:?}", event);
                for listener in listeners.iter_mut() {
                    if stamp <= listener.since {
                        continue;
                    }
                    if let (Some(target), Some(transition)) =
                        (listener.target.as_deref(), payload.transition())
                    {
                        if transition.step.id != target {
                            continue;
                        }
                    }
                    if host.is_stopped() {
                        return;
                    }
                    run(self.trace, &label, host, &mut self.queue, |ctx| {
                        (listener.callback)(ctx, &payload)
                    });
                }
            }
            Emission::Reply { label, run: reply } => {
                run(self.trace, label, host, &mut self.queue, reply);
            }
        }
    }

    /// Drops every listener and anything still queued
    pub(crate) fn stop(&mut self) {
        info!("cake: stopping after {} layers", self.layers);
        self.queue.clear();
        self.kind_listeners.clear();
        self.attribute_listeners.clear();
        self.external_listeners.clear();
        self.feeds.clear();
    }

    fn bump_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }
}

// Runs one callback in isolation, then the post-callback hook.
fn run<F>(trace: bool, label: &str, host: &mut dyn CakeHost, queue: &mut EmissionQueue, callback: F)
where
    F: FnOnce(&mut EventContext<'_>) -> CallbackResult,
{
    if trace {
        debug!("{} callback", label);
    }

    let result = {
        let mut ctx = host.context();
        panic::catch_unwind(AssertUnwindSafe(|| callback(&mut ctx)))
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("cake: {} callback failed: {}", label, err),
        Err(payload) => warn!(
            "cake: {} callback panicked: {}",
            label,
            panic_message(payload.as_ref())
        ),
    }

    queue.extend(host.post_callback());
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
