//! Realtime connection manager.
//!
//! [`RealtimeClient`] is a cheap, cloneable handle. All connection state lives
//! in one event-loop task that owns the transport handle and both timers;
//! handles talk to it over a FIFO command queue. Construct one client at
//! startup and pass clones to whatever needs the connection.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use linkup_shared::{Envelope, Heartbeat, WireMessage, EVENT_CLOSE, EVENT_OPEN};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};

use super::connection::{
    ConnectionState, Connector, TransportEvent, TransportHandle, TungsteniteConnector,
};
use super::registry::{Listener, Registry};
use crate::config::RealtimeConfig;
use crate::error::ClientError;

#[derive(Debug)]
enum Command {
    Connect { token: String },
    Disconnect,
    Send { kind: String, payload: Value },
    Shutdown,
}

/// Handle to a single managed realtime connection.
#[derive(Clone, Debug)]
pub struct RealtimeClient {
    commands: UnboundedSender<Command>,
    registry: Registry,
    state: watch::Receiver<ConnectionState>,
}

impl RealtimeClient {
    /// Create a client backed by real WebSockets.
    ///
    /// Must be called from within a tokio runtime; the event loop is spawned
    /// onto it immediately and stays `Idle` until [`connect`](Self::connect).
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_connector(config, TungsteniteConnector)
    }

    /// Create a client that opens sockets through `connector`.
    pub fn with_connector(config: RealtimeConfig, connector: impl Connector) -> Self {
        let (commands, command_rx) = unbounded();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let registry = Registry::default();

        let event_loop = EventLoop {
            config,
            connector: Arc::new(connector),
            registry: registry.clone(),
            commands: command_rx,
            state: ConnectionState::Idle,
            state_tx,
            url: None,
            transport: None,
            reconnect: None,
            heartbeat: None,
        };
        tokio::spawn(event_loop.run());

        Self {
            commands,
            registry,
            state,
        }
    }

    fn post(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .unbounded_send(command)
            .map_err(|_| ClientError::Closed)
    }

    /// Open a connection authenticated by `token`, replacing any current one.
    pub fn connect(&self, token: &str) -> Result<(), ClientError> {
        self.post(Command::Connect {
            token: token.to_string(),
        })
    }

    /// Close the connection and stop reconnecting. A no-op when already disconnected.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.post(Command::Disconnect)
    }

    /// Send an envelope of type `kind`.
    ///
    /// Delivered only if the connection is open when the event loop processes
    /// the request. Otherwise the message is dropped with a warning; nothing
    /// is queued for a later connection.
    pub fn send(&self, kind: &str, payload: Value) -> Result<(), ClientError> {
        self.post(Command::Send {
            kind: kind.to_string(),
            payload,
        })
    }

    /// Send a typed message under its declared type.
    pub fn send_message<M: WireMessage>(&self, message: &M) -> Result<(), ClientError> {
        let payload = message.to_payload()?;
        self.send(M::KIND, payload)
    }

    /// Register `listener` for messages of type `kind`, including the local
    /// `open` and `close` events. Registering the same listener twice has no
    /// further effect.
    pub fn on(&self, kind: &str, listener: Listener) -> Subscription {
        self.registry.add(kind, listener.clone());
        Subscription {
            registry: self.registry.clone(),
            kind: kind.to_string(),
            listener,
        }
    }

    /// Register a typed listener for `M::KIND`. Payloads that do not decode
    /// as `M` are logged and skipped.
    pub fn on_message<M, F>(&self, handler: F) -> Subscription
    where
        M: WireMessage + 'static,
        F: Fn(M) + Send + Sync + 'static,
    {
        let listener = Listener::new(move |payload: &Value| {
            match M::from_payload(payload.clone()) {
                Ok(message) => handler(message),
                Err(e) => crate::log_warn!("skipping `{}` listener: {}", M::KIND, e),
            }
        });
        self.on(M::KIND, listener)
    }

    /// Deregister `listener` from `kind`.
    pub fn off(&self, kind: &str, listener: &Listener) {
        self.registry.remove(kind, listener);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Disconnect and stop the event loop. Every clone of this client returns
    /// [`ClientError::Closed`] afterwards.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.post(Command::Shutdown)
    }
}

/// Returned by [`RealtimeClient::on`]; deregisters the listener on request.
///
/// Dropping a subscription keeps the listener registered.
#[derive(Debug)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    registry: Registry,
    kind: String,
    listener: Listener,
}

impl Subscription {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Same as calling `off` with the registered type and listener.
    pub fn unsubscribe(self) {
        self.registry.remove(&self.kind, &self.listener);
    }
}

struct EventLoop {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    registry: Registry,
    commands: UnboundedReceiver<Command>,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    /// Address of the last `connect`, reused by reconnects.
    url: Option<String>,
    transport: Option<TransportHandle>,
    reconnect: Option<Pin<Box<Sleep>>>,
    heartbeat: Option<Interval>,
}

impl EventLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                // Commands first, so a disconnect wins over a close event already queued.
                biased;

                command = self.commands.next() => match command {
                    Some(Command::Connect { token }) => self.connect(&token),
                    Some(Command::Disconnect) => self.disconnect(),
                    Some(Command::Send { kind, payload }) => self.send(&kind, payload),
                    Some(Command::Shutdown) | None => break,
                },
                event = next_event(&mut self.transport) => self.handle_event(event),
                _ = fire(&mut self.reconnect) => {
                    self.reconnect = None;
                    crate::log_info!("reconnecting to {}", self.config.endpoint_display());
                    self.open();
                }
                _ = tick(&mut self.heartbeat) => {
                    crate::log_debug!("sending heartbeat");
                    self.send_message(&Heartbeat::default());
                }
            }
        }

        self.disconnect();
        crate::log_debug!("realtime event loop stopped");
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn connect(&mut self, token: &str) {
        self.url = Some(self.config.endpoint_url(token));
        self.reconnect = None;
        self.open();
    }

    /// Replace the transport with a fresh one for the stored address.
    fn open(&mut self) {
        let Some(url) = self.url.clone() else {
            return;
        };

        self.heartbeat = None;
        if let Some(previous) = self.transport.take() {
            previous.close();
        }

        self.set_state(ConnectionState::Connecting);
        crate::log_info!("connecting to {}", self.config.endpoint_display());
        self.transport = Some(self.connector.open(&url));
    }

    fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.reconnect = None;
        self.heartbeat = None;
        self.url = None;
        if let Some(transport) = self.transport.take() {
            transport.close();
        }

        self.set_state(ConnectionState::Disconnected);
        crate::log_info!("disconnected from {}", self.config.endpoint_display());
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.opened(),
            TransportEvent::Text(text) => self.receive(&text),
            TransportEvent::Error(e) => {
                crate::log_error!("socket error on {}: {}", self.config.endpoint_display(), e)
            }
            TransportEvent::Closed { reason } => self.closed(reason),
        }
    }

    fn opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }

        self.reconnect = None;
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(heartbeat);

        self.set_state(ConnectionState::Open);
        crate::log_info!("connected to {}", self.config.endpoint_display());
        self.registry.dispatch(EVENT_OPEN, &Value::Null);
    }

    fn closed(&mut self, reason: Option<String>) {
        self.heartbeat = None;
        self.transport = None;
        self.set_state(ConnectionState::ClosedPendingReconnect);
        crate::log_info!(
            "connection to {} closed ({})",
            self.config.endpoint_display(),
            reason.as_deref().unwrap_or("no reason")
        );

        self.registry.dispatch(EVENT_CLOSE, &Value::Null);

        if self.reconnect.is_none() {
            let delay = self.config.reconnect_delay;
            crate::log_info!("reconnecting in {}ms", delay.as_millis());
            self.reconnect = Some(Box::pin(sleep(delay)));
        }
    }

    fn receive(&self, text: &str) {
        match Envelope::decode(text) {
            Ok(envelope) => {
                crate::log_debug!("received `{}`", envelope.kind);
                self.registry.dispatch(&envelope.kind, &envelope.payload);
            }
            Err(e) => crate::log_warn!("dropping malformed message: {}", e),
        }
    }

    fn send(&self, kind: &str, payload: Value) {
        let transport = match self.transport.as_ref() {
            Some(transport) if self.state.is_connected() => transport,
            _ => {
                crate::log_warn!("socket not open ({:?}), dropping `{}`", self.state, kind);
                return;
            }
        };

        let text = match Envelope::new(kind, payload).encode() {
            Ok(text) => text,
            Err(e) => {
                crate::log_error!("failed to encode `{}`: {}", kind, e);
                return;
            }
        };

        if !transport.send_text(text) {
            crate::log_warn!("socket stopped, dropping `{}`", kind);
        }
    }

    fn send_message<M: WireMessage>(&self, message: &M) {
        match message.to_payload() {
            Ok(payload) => self.send(M::KIND, payload),
            Err(e) => crate::log_error!("failed to encode `{}`: {}", M::KIND, e),
        }
    }
}

async fn next_event(transport: &mut Option<TransportHandle>) -> TransportEvent {
    match transport {
        Some(transport) => transport.next_event().await,
        None => pending().await,
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(heartbeat) => {
            heartbeat.tick().await;
        }
        None => pending().await,
    }
}
