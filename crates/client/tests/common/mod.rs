//! In-memory transport for driving the realtime client from tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use linkup_client::ws::{Connector, Outbound, TransportEvent, TransportHandle};
use serde_json::Value;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};

struct MockSocket {
    url: String,
    events: UnboundedSender<TransportEvent>,
    outbound: UnboundedReceiver<Outbound>,
    written: Vec<String>,
    closed: bool,
}

impl MockSocket {
    fn drain(&mut self) {
        loop {
            match self.outbound.try_recv() {
                Ok(Outbound::Text(text)) => self.written.push(text),
                Ok(Outbound::Close) => self.closed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

/// Records every socket the client opens and lets the test play the server.
#[derive(Clone, Default)]
pub struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl Connector for MockConnector {
    fn open(&self, url: &str) -> TransportHandle {
        let (handle, peer) = TransportHandle::pair();
        self.sockets.lock().unwrap().push(MockSocket {
            url: url.to_string(),
            events: peer.events,
            outbound: peer.outbound,
            written: Vec::new(),
            closed: false,
        });
        handle
    }
}

impl MockConnector {
    pub fn count(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    pub fn url(&self, index: usize) -> String {
        self.sockets.lock().unwrap()[index].url.clone()
    }

    /// Deliver `event` on socket `index`. Events for detached sockets are lost.
    pub fn emit(&self, index: usize, event: TransportEvent) {
        let _ = self.sockets.lock().unwrap()[index].events.send(event);
    }

    pub fn accept(&self, index: usize) {
        self.emit(index, TransportEvent::Opened);
    }

    pub fn push_text(&self, index: usize, text: &str) {
        self.emit(index, TransportEvent::Text(text.to_string()));
    }

    pub fn drop_connection(&self, index: usize) {
        self.emit(index, TransportEvent::Closed { reason: None });
    }

    /// Frames the client wrote to socket `index`, parsed as JSON.
    pub fn written(&self, index: usize) -> Vec<Value> {
        let mut sockets = self.sockets.lock().unwrap();
        let socket = &mut sockets[index];
        socket.drain();
        socket
            .written
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Whether the client closed or detached socket `index`.
    pub fn is_closed(&self, index: usize) -> bool {
        let mut sockets = self.sockets.lock().unwrap();
        let socket = &mut sockets[index];
        socket.drain();
        socket.closed
    }
}

/// Let the event loop run until it is idle. Needs a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
