//! Join handling: capacity check, membership, and the one-time pairing announcement.

use tracing::{debug, info};

use crate::ids::{RoomId, SessionId};
use crate::protocol::ServerMessage;
use crate::rooms::JoinOutcome;
use crate::service::SignalingService;
use crate::transport::Transport;

impl<T: Transport> SignalingService<T> {
    /// Join `session` to `room`.
    ///
    /// A full room answers `room-full` and leaves everything unchanged.
    /// Otherwise the session is appended, subscribed to the room's broadcast
    /// group and acknowledged with `joined-room`. When it is the second
    /// member, the first member gets `user-joined(session)` and the joiner gets
    /// `other-user(first)`; all of this happens before the room is unlocked.
    pub fn join(&self, session: &SessionId, room: &RoomId) -> JoinOutcome {
        let transport = &self.transport;
        let outcome = self.rooms.join_or_reject(room, session, |outcome| match outcome {
            JoinOutcome::Full => {
                let _ = transport.send(session, &ServerMessage::RoomFull);
            }
            JoinOutcome::AlreadyMember => {
                let _ = transport.send(session, &ServerMessage::JoinedRoom(room.clone()));
            }
            JoinOutcome::Waiting => {
                transport.subscribe(room, session);
                let _ = transport.send(session, &ServerMessage::JoinedRoom(room.clone()));
            }
            JoinOutcome::Paired { other } => {
                transport.subscribe(room, session);
                let _ = transport.send(session, &ServerMessage::JoinedRoom(room.clone()));
                let _ = transport.send(other, &ServerMessage::UserJoined(session.clone()));
                let _ = transport.send(session, &ServerMessage::OtherUser(other.clone()));
            }
        });

        match &outcome {
            JoinOutcome::Full => info!(session_id = %session, room_id = %room, "room is full"),
            JoinOutcome::AlreadyMember => {
                debug!(session_id = %session, room_id = %room, "already in room");
            }
            JoinOutcome::Waiting => {
                info!(session_id = %session, room_id = %room, members = 1, "joined room");
            }
            JoinOutcome::Paired { other } => info!(
                session_id = %session,
                room_id = %room,
                peer_id = %other,
                members = 2,
                "joined room, peers paired"
            ),
        }
        outcome
    }
}
