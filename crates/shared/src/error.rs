//! Shared error types.

/// Failure to decode or encode a wire envelope.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope is not a JSON object")]
    NotAnObject,
    #[error("envelope has no string `type` field")]
    MissingType,
    /// The payload did not have the shape declared for its message type.
    #[error("payload does not match `{kind}`: {source}")]
    Payload {
        kind: &'static str,
        source: serde_json::Error,
    },
}
