use std::sync::Arc;

use log::{info, warn};

use empirica_shared::ScopeKinds;

use crate::{
    config::AdminConfig,
    listeners::ListenersCollector,
    runloop::Runloop,
    transport::{AdminTransport, TransportError},
};

/// Lifecycle of the runloop as driven by the connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunloopState {
    Stopped,
    Initializing,
    Running,
}

/// The two signals the runloop depends on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub transport_connected: bool,
    pub session_established: bool,
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        self.transport_connected && self.session_established
    }
}

type Subscriber = Box<dyn Fn(&mut ListenersCollector)>;

/// Owns the transport and the registered subscribers, and (re)creates the
/// runloop whenever the connection comes up.
///
/// Subscribers are kept across reconnects and re-run against every new
/// runloop. Interest declared by a previous session is not carried over.
pub struct AdminContext<T: AdminTransport> {
    config: AdminConfig,
    kinds: Arc<ScopeKinds>,
    transport: T,
    connection: ConnectionState,
    subscribers: Vec<Subscriber>,
    runloop: Option<Runloop>,
    state: RunloopState,
}

impl<T: AdminTransport> AdminContext<T> {
    pub fn new(transport: T, mut kinds: ScopeKinds, config: AdminConfig) -> Self {
        if !kinds.is_locked() {
            kinds.lock();
        }
        Self {
            config,
            kinds: Arc::new(kinds),
            transport,
            connection: ConnectionState::default(),
            subscribers: Vec::new(),
            runloop: None,
            state: RunloopState::Stopped,
        }
    }

    /// Registers a subscriber. The subscriber runs right away so that a bad
    /// registration fails here rather than at connect time. When a runloop is
    /// running, the layer it builds is added immediately.
    pub fn register<F>(&mut self, subscriber: F)
    where
        F: Fn(&mut ListenersCollector) + 'static,
    {
        let mut listeners = ListenersCollector::new(self.kinds.clone());
        subscriber(&mut listeners);

        if self.state == RunloopState::Running {
            if let Some(runloop) = self.runloop.as_mut() {
                runloop.add_layer(listeners, &mut self.transport);
            }
        }

        self.subscribers.push(Box::new(subscriber));
    }

    pub fn set_transport_connected(&mut self, connected: bool) {
        self.connection.transport_connected = connected;
        self.update_state();
    }

    pub fn set_session_established(&mut self, established: bool) {
        self.connection.session_established = established;
        self.update_state();
    }

    /// Pumps pushed changes through the running runloop. A lost connection
    /// stops the runloop.
    pub fn receive(&mut self) -> Result<usize, TransportError> {
        let Some(runloop) = self.runloop.as_mut() else {
            return Ok(0);
        };
        let result = runloop.receive(&mut self.transport);
        if runloop.connection_lost() {
            warn!("admin: connection lost");
            self.connection.transport_connected = false;
            self.update_state();
        }
        result
    }

    fn update_state(&mut self) {
        if self.connection.is_ready() {
            if self.state == RunloopState::Stopped {
                self.start();
            }
        } else if self.state != RunloopState::Stopped {
            self.stop();
        }
    }

    fn start(&mut self) {
        self.state = RunloopState::Initializing;
        let mut runloop =
            match Runloop::start(self.config.clone(), self.kinds.clone(), &mut self.transport) {
                Ok(runloop) => runloop,
                Err(err) => {
                    warn!("admin: runloop failed to start: {}", err);
                    self.connection.transport_connected = false;
                    self.state = RunloopState::Stopped;
                    return;
                }
            };

        for subscriber in &self.subscribers {
            let mut listeners = ListenersCollector::new(self.kinds.clone());
            subscriber(&mut listeners);
            runloop.add_layer(listeners, &mut self.transport);
        }

        if runloop.connection_lost() {
            warn!("admin: connection lost while initializing");
            runloop.stop();
            self.connection.transport_connected = false;
            self.state = RunloopState::Stopped;
            return;
        }

        info!("admin: running with {} layers", runloop.layers());
        self.runloop = Some(runloop);
        self.state = RunloopState::Running;
    }

    fn stop(&mut self) {
        if let Some(mut runloop) = self.runloop.take() {
            runloop.stop();
        }
        self.state = RunloopState::Stopped;
        info!("admin: stopped");
    }

    pub fn state(&self) -> RunloopState {
        self.state
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn runloop(&self) -> Option<&Runloop> {
        self.runloop.as_ref()
    }

    pub fn kinds(&self) -> &Arc<ScopeKinds> {
        &self.kinds
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
