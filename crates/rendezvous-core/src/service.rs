//! `SignalingService`: entry point the transport drives with connection events.

use std::sync::Arc;

use tracing::debug;

use crate::ids::SessionId;
use crate::protocol::{ClientMessage, NegotiationKind};
use crate::rooms::RoomTable;
use crate::transport::Transport;

/// Pairing, routing and lifecycle handling over a shared [`RoomTable`].
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct SignalingService<T: Transport> {
    pub(crate) rooms: RoomTable,
    pub(crate) transport: Arc<T>,
}

impl<T: Transport> SignalingService<T> {
    /// Create a service with an empty room table.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            rooms: RoomTable::new(),
            transport,
        }
    }

    /// Read-only access to the room table.
    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    /// The transport notifications go out through.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Dispatch one decoded client message from `session`.
    pub fn handle(&self, session: &SessionId, message: ClientMessage) {
        debug!(session_id = %session, event = message.event_name(), "dispatching client message");
        match message {
            ClientMessage::JoinRoom(room) => {
                let _ = self.join(session, &room);
            }
            ClientMessage::LeaveRoom(room) => {
                let _ = self.leave(session, &room);
            }
            ClientMessage::Offer { offer, to } => {
                let _ = self.forward(session, NegotiationKind::Offer, offer, &to);
            }
            ClientMessage::Answer { answer, to } => {
                let _ = self.forward(session, NegotiationKind::Answer, answer, &to);
            }
            ClientMessage::IceCandidate { candidate, to } => {
                let _ = self.forward(session, NegotiationKind::IceCandidate, candidate, &to);
            }
        }
    }
}
