//! Per-connection WebSocket loop: greeting, reader/writer split, heartbeat and teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use rendezvous_core::{ClientMessage, ServerMessage, SessionId, SignalingService, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::registry::{Client, ClientRegistry};

/// Timing knobs for one connection.
#[derive(Clone, Copy, Debug)]
pub struct Heartbeat {
    /// Interval between Ping frames.
    pub interval: Duration,
    /// Close after this long without a Pong.
    pub timeout: Duration,
}

/// Drive one upgraded socket until the peer goes away, times out, or the
/// server shuts down. Membership is reconciled before the session is
/// removed from the registry.
#[instrument(skip_all, fields(session_id = tracing::field::Empty))]
pub async fn handle_ws_connection(
    socket: WebSocket,
    service: Arc<SignalingService<ClientRegistry>>,
    heartbeat: Heartbeat,
    shutdown: CancellationToken,
) {
    let registry = Arc::clone(service.transport());
    let (client, rx) = registry.register();
    let session_id = client.id.clone();
    let _ = tracing::Span::current().record("session_id", tracing::field::display(&session_id));
    info!(connections = registry.count(), "client connected");

    let _ = registry.send(&session_id, &ServerMessage::Connected(session_id.clone()));

    let (ws_tx, ws_rx) = socket.split();

    let writer = tokio::spawn(write_loop(
        ws_tx,
        rx,
        Arc::clone(&client),
        heartbeat,
        shutdown.clone(),
    ));
    let reader = tokio::spawn(read_loop(
        ws_rx,
        Arc::clone(&service),
        Arc::clone(&client),
        shutdown,
    ));

    join_halves(writer, reader).await;

    let left = service.disconnect(&session_id);
    registry.unregister(&session_id);
    info!(
        rooms_left = left,
        dropped_messages = client.drop_count(),
        duration_secs = client.age().as_secs(),
        "client disconnected"
    );
}

/// Wait for either half to finish, then abort the other and wait for it as
/// well. A reader still inside `service.handle` must not commit a join after
/// the disconnect scan has run.
async fn join_halves(mut writer: JoinHandle<()>, mut reader: JoinHandle<()>) {
    tokio::select! {
        _ = &mut writer => {
            reader.abort();
            let _ = reader.await;
        }
        _ = &mut reader => {
            writer.abort();
            let _ = writer.await;
        }
    }
}

async fn write_loop(
    mut ws_tx: futures::stream::SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<String>,
    client: Arc<Client>,
    heartbeat: Heartbeat,
    shutdown: CancellationToken,
) {
    let mut ping_interval = tokio::time::interval(heartbeat.interval);
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(text) = msg else { break };
                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let silent = client.last_pong_elapsed();
                if silent > heartbeat.timeout {
                    warn!(session_id = %client.id, silent_secs = silent.as_secs(), "client timed out");
                    break;
                }
                if ws_tx.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                trace!(session_id = %client.id, "sent ping");
            }
            () = shutdown.cancelled() => {
                let _ = ws_tx.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
}

async fn read_loop(
    mut ws_rx: futures::stream::SplitStream<WebSocket>,
    service: Arc<SignalingService<ClientRegistry>>,
    client: Arc<Client>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = shutdown.cancelled() => break,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(session_id = %client.id, error = %e, "websocket read error");
                break;
            }
            None => break,
        };
        match msg {
            WsMessage::Text(text) => {
                client.record_pong();
                dispatch(&service, &client.id, ClientMessage::decode(text.as_str()));
            }
            WsMessage::Binary(bytes) => {
                client.record_pong();
                dispatch(&service, &client.id, ClientMessage::decode_bytes(&bytes));
            }
            WsMessage::Pong(_) => client.record_pong(),
            WsMessage::Close(_) => break,
            // axum answers Pings itself
            WsMessage::Ping(_) => {}
        }
    }
}

fn dispatch(
    service: &SignalingService<ClientRegistry>,
    session: &SessionId,
    decoded: rendezvous_core::errors::Result<ClientMessage>,
) {
    match decoded {
        Ok(message) => service.handle(session, message),
        Err(e) => {
            let cause = std::error::Error::source(&e).map(ToString::to_string);
            warn!(
                session_id = %session,
                error = %e,
                cause = cause.as_deref().unwrap_or_default(),
                "ignoring malformed message"
            );
        }
    }
}
