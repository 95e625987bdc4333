//! # rendezvous-server
//!
//! Axum transport for the signaling core: a `/ws` endpoint carrying the JSON
//! event protocol and a `/health` endpoint.
//!
//! - [`registry::ClientRegistry`]: live sessions, outbound queues and room
//!   broadcast groups; implements [`rendezvous_core::Transport`]
//! - [`connection`]: per-socket reader/writer tasks with heartbeat
//! - [`server`]: router, CORS and startup
//! - [`shutdown`]: shutdown token and connection-task drain

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::ServerError;
pub use registry::ClientRegistry;
pub use server::{build_router, start, AppState, ServerHandle};
pub use shutdown::Shutdown;
