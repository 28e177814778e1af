//! WebSocket module for the realtime connection.
//!
//! This module provides:
//! - A single managed connection with fixed-interval auto-reconnect
//! - A keep-alive heartbeat while the connection is open
//! - A listener registry dispatching inbound messages by type
//!
//! # Architecture
//!
//! ```text
//!   ┌────────────────┐  ┌────────────────┐
//!   │ RealtimeClient │  │ RealtimeClient │   (cloned handles)
//!   └────────────────┘  └────────────────┘
//!            │ commands          │
//!            └─────────┬─────────┘
//!                      ▼
//!          ┌───────────────────────┐
//!          │       EventLoop       │  owns transport, reconnect
//!          │  (one tokio task)     │  timer and heartbeat timer
//!          └───────────────────────┘
//!              │               ▲
//!     outbound │               │ TransportEvent
//!              ▼               │
//!          ┌───────────────────────┐
//!          │    TransportHandle    │  (Connector::open per attempt)
//!          └───────────────────────┘
//!                      │
//!                      ▼
//!          ┌───────────────────────┐
//!          │  Registry -> Listener │  (open, close, and wire types)
//!          └───────────────────────┘
//! ```

pub mod connection;
pub mod manager;
pub mod registry;

pub use connection::{
    ConnectionState, Connector, Outbound, TransportEvent, TransportHandle, TransportPeer,
    TungsteniteConnector,
};
pub use manager::{RealtimeClient, Subscription};
pub use registry::{Listener, Registry};
