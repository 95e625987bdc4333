//! Router assembly and server startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use rendezvous_core::SignalingService;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::connection::{self, Heartbeat};
use crate::error::{Result, ServerError};
use crate::health;
use crate::registry::ClientRegistry;
use crate::shutdown::Shutdown;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pairing, routing and lifecycle over the shared room table.
    pub service: Arc<SignalingService<ClientRegistry>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Shutdown token plus the tracker every connection task registers with.
    pub shutdown: Shutdown,
}

impl AppState {
    /// Fresh state with an empty registry and room table.
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        let registry = Arc::new(ClientRegistry::new(config.send_queue));
        Self {
            service: Arc::new(SignalingService::new(registry)),
            config: Arc::new(config),
            start_time: Instant::now(),
            shutdown,
        }
    }
}

/// Build the CORS layer for the configured origin(s).
pub fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let spec = config.cors_origin.trim();
    let allow_origin = if spec == "*" {
        AllowOrigin::any()
    } else {
        let origins = spec
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| {
                HeaderValue::from_str(o).map_err(|_| ServerError::InvalidCorsOrigin(o.to_owned()))
            })
            .collect::<Result<Vec<_>>>()?;
        match origins.len() {
            0 => return Err(ServerError::InvalidCorsOrigin(config.cors_origin.clone())),
            1 => AllowOrigin::exact(origins[0].clone()),
            _ => AllowOrigin::list(origins),
        }
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST]))
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config)?;
    Ok(Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Bind the listener and serve until `shutdown` is cancelled. Connection
/// tasks are tracked on `shutdown` so [`Shutdown::drain`] can wait for them.
pub async fn start(config: ServerConfig, shutdown: &Shutdown) -> Result<ServerHandle> {
    let addr = config.bind_addr();
    let state = AppState::new(config, shutdown.clone());
    let token = shutdown.token();
    let service = Arc::clone(&state.service);
    let router = build_router(state)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "rendezvous server listening");

    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server terminated with error");
        }
        tracing::info!("rendezvous server stopped");
    });

    Ok(ServerHandle {
        addr: local_addr,
        port: local_addr.port(),
        service,
        server,
    })
}

/// Handle returned by [`start`].
pub struct ServerHandle {
    /// Bound address.
    pub addr: SocketAddr,
    /// Bound port (useful when configured with port 0).
    pub port: u16,
    /// The running service, for inspection.
    pub service: Arc<SignalingService<ClientRegistry>>,
    server: JoinHandle<()>,
}

impl ServerHandle {
    /// The serve task, for [`Shutdown::drain`].
    pub fn into_task(self) -> JoinHandle<()> {
        self.server
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let heartbeat = Heartbeat {
        interval: state.config.heartbeat_interval(),
        timeout: state.config.client_timeout(),
    };
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            let token = state.shutdown.token();
            state.shutdown.track_connection(connection::handle_ws_connection(
                socket,
                state.service,
                heartbeat,
                token,
            ))
        })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(health::health_check(
        state.start_time,
        state.service.rooms().len(),
        state.service.transport().count(),
    ))
}
