//! Session registry: live connections, their outbound queues and room broadcast groups.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use rendezvous_core::{RoomId, ServerMessage, SessionId, Transport};
use tokio::sync::mpsc;

/// A connected WebSocket client.
pub struct Client {
    /// Session id assigned on connect.
    pub id: SessionId,
    tx: mpsc::Sender<String>,
    connected_at: Instant,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl Client {
    fn new(id: SessionId, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue an already-encoded frame. Returns `false` if the queue is full or closed.
    pub fn send(&self, frame: String) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    session_id = %self.id,
                    frame_len = frame.len(),
                    "send queue full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Record a Pong (or any other sign of life).
    pub fn record_pong(&self) {
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last Pong, or since connecting.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Messages dropped because the queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Registry of every connected client, keyed by session id.
pub struct ClientRegistry {
    clients: DashMap<SessionId, Arc<Client>>,
    groups: DashMap<RoomId, BTreeSet<SessionId>>,
    max_send_queue: usize,
}

impl ClientRegistry {
    /// Create an empty registry whose clients get queues of `max_send_queue` frames.
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            groups: DashMap::new(),
            max_send_queue: max_send_queue.max(1),
        }
    }

    /// Register a new connection, minting its session id.
    pub fn register(&self) -> (Arc<Client>, mpsc::Receiver<String>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let client = Arc::new(Client::new(id.clone(), tx));
        let _ = self.clients.insert(id, Arc::clone(&client));
        (client, rx)
    }

    /// Forget a connection and drop it from every broadcast group.
    pub fn unregister(&self, id: &SessionId) {
        let _ = self.clients.remove(id);
        self.groups.retain(|_, members| {
            let _ = members.remove(id);
            !members.is_empty()
        });
    }

    /// Look up a live client.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Client>> {
        self.clients.get(id).map(|c| Arc::clone(c.value()))
    }

    /// Queue an encoded frame for one client. `false` if unknown, closed or full.
    pub fn send_to(&self, id: &SessionId, frame: String) -> bool {
        match self.get(id) {
            Some(client) => client.send(frame),
            None => false,
        }
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Sessions currently subscribed to `room`.
    pub fn subscribers(&self, room: &RoomId) -> Vec<SessionId> {
        self.groups
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match message.encode() {
        Ok(frame) => Some(frame),
        Err(e) => {
            let cause = std::error::Error::source(&e).map(ToString::to_string);
            tracing::error!(
                event = message.event_name(),
                error = %e,
                cause = cause.as_deref().unwrap_or_default(),
                "failed to encode message"
            );
            None
        }
    }
}

impl Transport for ClientRegistry {
    fn send(&self, to: &SessionId, message: &ServerMessage) -> bool {
        encode(message).is_some_and(|frame| self.send_to(to, frame))
    }

    fn subscribe(&self, room: &RoomId, session: &SessionId) {
        let _ = self
            .groups
            .entry(room.clone())
            .or_default()
            .insert(session.clone());
    }

    fn unsubscribe(&self, room: &RoomId, session: &SessionId) {
        let _ = self.groups.remove_if_mut(room, |_, members| {
            let _ = members.remove(session);
            members.is_empty()
        });
    }

    fn broadcast_to_room(&self, room: &RoomId, except: &SessionId, message: &ServerMessage) -> usize {
        let targets: Vec<SessionId> = self
            .subscribers(room)
            .into_iter()
            .filter(|s| s != except)
            .collect();
        if targets.is_empty() {
            return 0;
        }
        let Some(frame) = encode(message) else {
            return 0;
        };
        targets
            .iter()
            .filter(|id| self.send_to(id, frame.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(s: &str) -> RoomId {
        RoomId::from(s)
    }

    #[test]
    fn register_mints_unique_session_ids() {
        let registry = ClientRegistry::new(32);
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();
        assert_ne!(a.id, b.id);
        assert!(a.id.as_str().starts_with("sess_"));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn unregister_removes_client() {
        let registry = ClientRegistry::new(32);
        let (a, _rx) = registry.register();
        registry.unregister(&a.id);
        assert_eq!(registry.count(), 0);
        assert!(registry.get(&a.id).is_none());
    }

    #[tokio::test]
    async fn send_encodes_envelope() {
        let registry = ClientRegistry::new(32);
        let (a, mut rx) = registry.register();
        assert!(registry.send(&a.id, &ServerMessage::JoinedRoom(room("r1"))));
        let frame = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["event"], "joined-room");
        assert_eq!(json["data"], "r1");
    }

    #[test]
    fn send_to_unknown_session_is_dropped() {
        let registry = ClientRegistry::new(32);
        assert!(!registry.send(&SessionId::from("nobody"), &ServerMessage::UserLeft));
    }

    #[test]
    fn send_to_closed_receiver_fails() {
        let registry = ClientRegistry::new(32);
        let (a, rx) = registry.register();
        drop(rx);
        assert!(!registry.send(&a.id, &ServerMessage::UserLeft));
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let registry = ClientRegistry::new(1);
        let (a, _rx) = registry.register();
        assert!(registry.send(&a.id, &ServerMessage::UserLeft));
        assert!(!registry.send(&a.id, &ServerMessage::UserLeft));
        assert_eq!(a.drop_count(), 1);
    }

    #[test]
    fn broadcast_skips_sender_and_non_members() {
        let registry = ClientRegistry::new(32);
        let (a, mut rx_a) = registry.register();
        let (b, mut rx_b) = registry.register();
        let (_c, mut rx_c) = registry.register();
        registry.subscribe(&room("r1"), &a.id);
        registry.subscribe(&room("r1"), &b.id);

        let sent = registry.broadcast_to_room(&room("r1"), &a.id, &ServerMessage::UserLeft);
        assert_eq!(sent, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_drops_empty_group() {
        let registry = ClientRegistry::new(32);
        let (a, _rx) = registry.register();
        registry.subscribe(&room("r1"), &a.id);
        assert_eq!(registry.subscribers(&room("r1")), vec![a.id.clone()]);
        registry.unsubscribe(&room("r1"), &a.id);
        assert!(registry.subscribers(&room("r1")).is_empty());
        assert!(registry.groups.is_empty());
    }

    #[test]
    fn unregister_clears_subscriptions() {
        let registry = ClientRegistry::new(32);
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();
        registry.subscribe(&room("r1"), &a.id);
        registry.subscribe(&room("r1"), &b.id);
        registry.subscribe(&room("r2"), &a.id);

        registry.unregister(&a.id);
        assert_eq!(registry.subscribers(&room("r1")), vec![b.id.clone()]);
        assert!(registry.subscribers(&room("r2")).is_empty());
    }

    #[test]
    fn pong_tracking() {
        let registry = ClientRegistry::new(32);
        let (a, _rx) = registry.register();
        std::thread::sleep(Duration::from_millis(5));
        assert!(a.last_pong_elapsed() >= Duration::from_millis(5));
        a.record_pong();
        assert!(a.last_pong_elapsed() < Duration::from_millis(5));
        assert!(a.age() >= Duration::from_millis(5));
    }
}
