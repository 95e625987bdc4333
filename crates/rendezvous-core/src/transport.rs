//! The seam between the signaling core and whatever carries its messages.

use crate::ids::{RoomId, SessionId};
use crate::protocol::ServerMessage;

/// Delivery primitives the core needs from the connection layer.
///
/// Every method must be non-blocking: the core calls them while holding a
/// room's lock. Sends are best-effort and fire-and-forget.
pub trait Transport: Send + Sync {
    /// Queue `message` for session `to`. Returns `false` if the session is
    /// unknown, closed, or its queue is full; the message is then dropped.
    fn send(&self, to: &SessionId, message: &ServerMessage) -> bool;

    /// Add `session` to the broadcast group of `room`.
    fn subscribe(&self, room: &RoomId, session: &SessionId);

    /// Remove `session` from the broadcast group of `room`.
    fn unsubscribe(&self, room: &RoomId, session: &SessionId);

    /// Send `message` to every subscriber of `room` except `except`.
    /// Returns the number of sessions the message was queued for.
    fn broadcast_to_room(&self, room: &RoomId, except: &SessionId, message: &ServerMessage)
        -> usize;
}
