//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3006;

/// Configuration for the rendezvous server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3006`, `0` for auto-assign).
    pub port: u16,
    /// Allowed cross-origin callers: `"*"` for any, otherwise one origin or a
    /// comma-separated list.
    pub cors_origin: String,
    /// Seconds between server-initiated Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a Pong.
    pub client_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue length; messages beyond it are dropped.
    pub send_queue: usize,
}

impl ServerConfig {
    /// Heartbeat interval as a `Duration` (never zero).
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Client timeout as a `Duration`.
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    /// `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            cors_origin: "*".into(),
            heartbeat_interval_secs: 25,
            client_timeout_secs: 60,
            max_message_size: 1024 * 1024, // 1 MB
            send_queue: 256,
        }
    }
}
