//! Leave and disconnect reconciliation.

use tracing::{debug, info};

use crate::ids::{RoomId, SessionId};
use crate::protocol::ServerMessage;
use crate::rooms::LeaveOutcome;
use crate::service::SignalingService;
use crate::transport::Transport;

impl<T: Transport> SignalingService<T> {
    /// Remove `session` from `room`.
    ///
    /// Remaining members get `user-left`, an emptied room is deleted, and the
    /// session is unsubscribed from the room's broadcast group, all under the
    /// room's lock. Leaving a room the session is not in is a no-op and
    /// returns `None`.
    pub fn leave(&self, session: &SessionId, room: &RoomId) -> Option<LeaveOutcome> {
        let transport = &self.transport;
        let outcome = self.rooms.remove_member(room, session, |outcome| {
            let notified = transport.broadcast_to_room(room, session, &ServerMessage::UserLeft);
            debug!(room_id = %room, notified, remaining = outcome.remaining.len(), "sent user-left");
            transport.unsubscribe(room, session);
        });

        match &outcome {
            Some(o) if o.room_deleted() => {
                info!(session_id = %session, room_id = %room, "left room, room deleted");
            }
            Some(o) => info!(
                session_id = %session,
                room_id = %room,
                members = o.remaining.len(),
                "left room"
            ),
            None => debug!(session_id = %session, room_id = %room, "leave ignored, not a member"),
        }
        outcome
    }

    /// Clean up after a closed connection.
    ///
    /// Scans every room and runs [`leave`](Self::leave) for each one that
    /// lists `session`. Returns how many rooms were cleaned up.
    pub fn disconnect(&self, session: &SessionId) -> usize {
        let rooms = self.rooms.rooms_containing(session);
        let cleaned = rooms
            .iter()
            .filter(|room| self.leave(session, room).is_some())
            .count();
        info!(session_id = %session, rooms = cleaned, "session disconnected");
        cleaned
    }
}
