//! Shutdown: one token every connection watches, plus a tracker of the
//! connection tasks so teardown can wait for their room cleanup.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// How long [`Shutdown::drain`] waits by default.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shutdown signal and the set of live connection tasks.
///
/// Cloning is cheap; clones share the same token and tracker.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
    connections: TaskTracker,
}

impl Shutdown {
    /// Fresh, un-cancelled handle with no tracked connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the listener and every connection loop watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wrap a connection future so [`drain`](Self::drain) waits for it.
    pub fn track_connection<F>(&self, connection: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        self.connections.track_future(connection)
    }

    /// Connection tasks still running.
    pub fn live_connections(&self) -> usize {
        self.connections.len()
    }

    /// Cancel the token, then wait up to `timeout` for the serve task and
    /// every tracked connection (including its disconnect cleanup) to finish.
    /// Returns `false` if the timeout elapsed first.
    pub async fn drain(&self, server: JoinHandle<()>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        self.token.cancel();
        let _ = self.connections.close();
        info!(
            connections = self.connections.len(),
            timeout_secs = timeout.as_secs(),
            "draining connections"
        );

        let connections = self.connections.clone();
        let drained = async move {
            let _ = server.await;
            connections.wait().await;
        };
        if tokio::time::timeout(timeout, drained).await.is_err() {
            warn!(
                connections = self.connections.len(),
                "shutdown timed out after {timeout:?}"
            );
            return false;
        }
        info!("all connections closed");
        true
    }
}
