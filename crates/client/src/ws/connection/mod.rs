//! Socket transport abstraction and connection state.
//!
//! This module provides the shared types and the native implementation.
//! A [`Connector`] opens one [`TransportHandle`] per connection attempt; the
//! handle is the manager's only view of the underlying socket.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Lifecycle state of a realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    Connecting,
    Open,
    /// Lost unexpectedly; a reconnect is scheduled.
    ClosedPendingReconnect,
    /// Closed on request. Only a new `connect` leaves this state.
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::ClosedPendingReconnect
        )
    }
}

/// Signals a transport reports about its socket, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The socket is established and writable.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// Informational. A `Closed` event follows when the error ends the socket.
    Error(String),
    /// The socket is gone. Always the last event of a handle.
    Closed { reason: Option<String> },
}

/// Frames the manager asks a transport to write.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    /// Close the socket and stop.
    Close,
}

/// Manager-side end of one socket.
///
/// Dropping the handle detaches it: the transport sees both channels close and
/// must shut its socket down without reporting further events.
#[derive(Debug)]
pub struct TransportHandle {
    outbound: UnboundedSender<Outbound>,
    events: UnboundedReceiver<TransportEvent>,
}

/// Transport-side end of one socket, handed to the [`Connector`] implementation.
#[derive(Debug)]
pub struct TransportPeer {
    pub events: UnboundedSender<TransportEvent>,
    pub outbound: UnboundedReceiver<Outbound>,
}

impl TransportHandle {
    /// Create a connected handle/peer pair.
    pub fn pair() -> (TransportHandle, TransportPeer) {
        let (outbound_tx, outbound_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();
        (
            TransportHandle {
                outbound: outbound_tx,
                events: events_rx,
            },
            TransportPeer {
                events: events_tx,
                outbound: outbound_rx,
            },
        )
    }

    /// Queue a text frame. Returns `false` if the transport has already stopped.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.send(Outbound::Text(text)).is_ok()
    }

    /// Next event from the transport. A transport that stops without saying so
    /// is reported as closed.
    pub async fn next_event(&mut self) -> TransportEvent {
        self.events
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed { reason: None })
    }

    /// Ask the transport to close the socket and detach from it.
    pub fn close(self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Opens sockets. Opening never fails synchronously: failures arrive on the
/// returned handle as `Error`/`Closed` events.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> TransportHandle;
}

mod connection_native;
pub use connection_native::TungsteniteConnector;
