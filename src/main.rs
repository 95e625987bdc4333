//! `rendezvous` binary: parse configuration, install logging, serve until signalled.

use anyhow::Context;
use clap::Parser;
use rendezvous_server::{ServerConfig, Shutdown, DEFAULT_PORT};
use rendezvous_telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use tracing::Level;

/// WebRTC signaling rendezvous server.
///
/// Pairs clients two to a room and relays offer, answer and ICE candidate
/// messages between them over WebSocket.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Allowed CORS origin(s): `*`, one origin, or a comma-separated list
    #[arg(long, default_value = "*", env = "CORS_ORIGIN")]
    cors_origin: String,

    /// Default log level (`RUST_LOG` overrides)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: Level,

    /// Log output format: pretty or json
    #[arg(long, default_value = "pretty", env = "LOG_FORMAT")]
    log_format: LogFormat,

    /// Seconds between WebSocket pings
    #[arg(long, default_value_t = 25, env = "HEARTBEAT_INTERVAL_SECS")]
    heartbeat_interval_secs: u64,

    /// Drop a client after this many seconds without a pong
    #[arg(long, default_value_t = 60, env = "CLIENT_TIMEOUT_SECS")]
    client_timeout_secs: u64,

    /// Max inbound WebSocket message size in bytes
    #[arg(long, default_value_t = 1024 * 1024, env = "MAX_MESSAGE_SIZE")]
    max_message_size: usize,

    /// Per-connection outbound queue length
    #[arg(long, default_value_t = 256, env = "SEND_QUEUE")]
    send_queue: usize,
}

impl Cli {
    fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level,
            format: self.log_format,
            ..TelemetryConfig::default()
        }
    }

    fn server_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            cors_origin: self.cors_origin,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            client_timeout_secs: self.client_timeout_secs,
            max_message_size: self.max_message_size,
            send_queue: self.send_queue,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli.telemetry()).context("failed to initialize logging")?;

    let config = cli.server_config();
    tracing::info!(
        host = %config.host,
        port = config.port,
        cors_origin = %config.cors_origin,
        "starting rendezvous server"
    );

    let shutdown = Shutdown::new();
    let handle = rendezvous_server::start(config, &shutdown)
        .await
        .context("failed to start server")?;
    tracing::info!(addr = %handle.addr, "rendezvous server ready");

    shutdown_signal().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    let _ = shutdown.drain(handle.into_task(), None).await;
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r,
        _ = term.recv() => Ok(()),
    }
}

/// Resolve on Ctrl+C.
#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
