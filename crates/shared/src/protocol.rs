//! Realtime socket protocol: envelope format, reserved types and endpoint URLs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Fixed path of the realtime socket endpoint.
pub const WS_PATH: &str = "/ws/mobile";

/// Keep-alive message type sent by the client while connected.
pub const HEARTBEAT: &str = "heartbeat";

/// Local event dispatched when a connection is established. Never sent over the wire.
pub const EVENT_OPEN: &str = "open";

/// Local event dispatched whenever a connection is lost. Never sent over the wire.
pub const EVENT_CLOSE: &str = "close";

/// A message crossing the socket in either direction.
///
/// Serializes to exactly `{"type": .., "payload": .., "timestamp": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    /// Milliseconds since the Unix epoch, set by the sender.
    pub timestamp: i64,
}

impl Envelope {
    /// Build an outbound envelope stamped with the current time.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an inbound frame.
    ///
    /// Only `type` is required. A missing `payload` decodes as `null` and the
    /// timestamp is not validated: anything that is not an integer becomes 0.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(ProtocolError::MissingType),
        };
        let payload = fields.remove("payload").unwrap_or(Value::Null);
        let timestamp = fields
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or_default();

        Ok(Self {
            kind,
            payload,
            timestamp,
        })
    }
}

/// Build the socket URL: `{ws:|wss:}//{host}{path}?token={token}`.
///
/// The token is percent-encoded; URL-safe tokens pass through unchanged.
pub fn endpoint_url(secure: bool, host: &str, path: &str, token: &str) -> String {
    let scheme = if secure { "wss:" } else { "ws:" };
    format!(
        "{}//{}{}?token={}",
        scheme,
        host.trim_end_matches('/'),
        path,
        urlencoding::encode(token)
    )
}

/// Check if a host is a local/development address.
pub fn is_local_address(host: &str) -> bool {
    let host_part = host.split(':').next().unwrap_or(host);
    host_part == "localhost"
        || host_part == "127.0.0.1"
        || host_part == "0.0.0.0"
        || host_part.starts_with("192.168.")
        || host_part.starts_with("10.")
}
