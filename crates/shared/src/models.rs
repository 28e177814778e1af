//! Typed messages carried inside envelopes.
//!
//! Every message type declares its wire `type` string through [`WireMessage`],
//! so the mapping from type string to payload shape lives next to the shape.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::protocol::HEARTBEAT;

/// A payload shape bound to its envelope `type`.
pub trait WireMessage: Serialize + DeserializeOwned {
    const KIND: &'static str;

    fn to_payload(&self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(|source| ProtocolError::Payload {
            kind: Self::KIND,
            source,
        })
    }

    fn from_payload(payload: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
            kind: Self::KIND,
            source,
        })
    }
}

// --- Keep-alive ---

/// Heartbeat payload, always the empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {}

impl WireMessage for Heartbeat {
    const KIND: &'static str = HEARTBEAT;
}

// --- Entities ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    /// Extra server-side attributes the client passes through untouched.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    Ended,
}

// --- Server pushes ---

/// The current session changed; `None` means there is no current session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdated {
    pub session: Option<Session>,
}

impl WireMessage for SessionUpdated {
    const KIND: &'static str = "session_update";
}

/// The signed-in user's profile changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdated {
    pub user: User,
}

impl WireMessage for UserUpdated {
    const KIND: &'static str = "user_update";
}
