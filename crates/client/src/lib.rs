//! Linkup Client - realtime connection manager
//!
//! This crate keeps one WebSocket connection to the linkup backend alive,
//! dispatches inbound messages to typed listeners, and holds the auth and
//! application stores those messages populate.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod stores;
pub mod ws;

pub use config::{PageOrigin, RealtimeConfig};
pub use error::ClientError;
pub use stores::{AppStore, AuthStore};
pub use ws::{ConnectionState, Listener, RealtimeClient, Subscription};
