//! Native WebSocket transport using tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{Connector, Outbound, TransportEvent, TransportHandle, TransportPeer};

/// Opens real WebSocket connections. Each socket runs in its own tokio task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn open(&self, url: &str) -> TransportHandle {
        let (handle, peer) = TransportHandle::pair();
        tokio::spawn(run_socket(url.to_string(), peer));
        handle
    }
}

/// Drive one socket until it closes or the manager detaches.
async fn run_socket(url: String, peer: TransportPeer) {
    let TransportPeer {
        events,
        mut outbound,
    } = peer;

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        // Handle dropped while the handshake was in flight
        _ = events.closed() => return,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Closed { reason: None });
            return;
        }
    };

    if events.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            msg_result = read.next() => match msg_result {
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Text(text.as_str().to_owned())).is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.as_str().to_owned());
                }
                Some(Ok(Message::Ping(data))) => {
                    // Pong is handled automatically by tungstenite
                    crate::log_debug!("Received ping: {:?}", data);
                }
                Some(Ok(_)) => {
                    // Ignore binary, pong, etc.
                }
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break None;
                }
                None => break None,
            },
            frame = outbound.recv() => match frame {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break None;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = write.close().await;
                    return;
                }
            },
        }
    };

    let _ = events.send(TransportEvent::Closed { reason });
}
