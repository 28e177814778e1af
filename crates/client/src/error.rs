//! Client error types.

use linkup_shared::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client's event loop has stopped, either through
    /// [`RealtimeClient::shutdown`](crate::RealtimeClient::shutdown) or because
    /// its runtime went away.
    #[error("realtime event loop has shut down")]
    Closed,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid origin `{0}`")]
    InvalidOrigin(String),
}
