//! Server error types.

use thiserror::Error;

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or inspecting the listening socket failed.
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    /// A configured CORS origin is not a valid header value.
    #[error("invalid CORS origin: {0:?}")]
    InvalidCorsOrigin(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
