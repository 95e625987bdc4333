//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding or encoding wire messages.
///
/// None of these are fatal: the connection loop logs them and keeps going.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not a known `{event, data}` envelope.
    #[error("malformed client message")]
    Decode(#[source] serde_json::Error),
    /// A server message could not be serialized.
    #[error("failed to encode server message")]
    Encode(#[source] serde_json::Error),
    /// A binary frame did not contain UTF-8 text.
    #[error("binary frame is not valid UTF-8")]
    NonUtf8,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
