//! Wire protocol: named events carried as `{"event": ..., "data": ...}` JSON envelopes.
//!
//! Negotiation payloads (`offer`, `answer`, `candidate`) are kept as opaque
//! [`serde_json::Value`]s and relayed byte-for-byte in meaning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};
use crate::ids::{RoomId, SessionId};

/// Messages a client may send.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Ask to join the named room.
    JoinRoom(RoomId),
    /// SDP offer addressed to another session.
    Offer {
        /// Opaque offer payload.
        offer: Value,
        /// Target session.
        to: SessionId,
    },
    /// SDP answer addressed to another session.
    Answer {
        /// Opaque answer payload.
        answer: Value,
        /// Target session.
        to: SessionId,
    },
    /// ICE candidate addressed to another session.
    IceCandidate {
        /// Opaque candidate payload.
        candidate: Value,
        /// Target session.
        to: SessionId,
    },
    /// Leave the named room.
    LeaveRoom(RoomId),
}

impl ClientMessage {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// Decode a binary frame holding UTF-8 JSON.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NonUtf8)?;
        Self::decode(text)
    }

    /// Event name, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "join-room",
            Self::Offer { .. } => NegotiationKind::Offer.event_name(),
            Self::Answer { .. } => NegotiationKind::Answer.event_name(),
            Self::IceCandidate { .. } => NegotiationKind::IceCandidate.event_name(),
            Self::LeaveRoom(_) => "leave-room",
        }
    }
}

/// Messages the server emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Greeting carrying the connection's own session id.
    Connected(SessionId),
    /// The requested room already holds two sessions.
    RoomFull,
    /// The join succeeded.
    JoinedRoom(RoomId),
    /// Sent to the second joiner: the session already waiting in the room.
    OtherUser(SessionId),
    /// Sent to the first member: the session that just joined.
    UserJoined(SessionId),
    /// The other member of the room left or disconnected.
    UserLeft,
    /// Relayed offer.
    Offer {
        /// Opaque offer payload.
        offer: Value,
        /// Sender session.
        from: SessionId,
    },
    /// Relayed answer.
    Answer {
        /// Opaque answer payload.
        answer: Value,
        /// Sender session.
        from: SessionId,
    },
    /// Relayed ICE candidate.
    IceCandidate {
        /// Opaque candidate payload.
        candidate: Value,
        /// Sender session.
        from: SessionId,
    },
}

impl ServerMessage {
    /// Build the relayed form of a negotiation message.
    pub fn relayed(kind: NegotiationKind, payload: Value, from: SessionId) -> Self {
        match kind {
            NegotiationKind::Offer => Self::Offer {
                offer: payload,
                from,
            },
            NegotiationKind::Answer => Self::Answer {
                answer: payload,
                from,
            },
            NegotiationKind::IceCandidate => Self::IceCandidate {
                candidate: payload,
                from,
            },
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Event name, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::RoomFull => "room-full",
            Self::JoinedRoom(_) => "joined-room",
            Self::OtherUser(_) => "other-user",
            Self::UserJoined(_) => "user-joined",
            Self::UserLeft => "user-left",
            Self::Offer { .. } => NegotiationKind::Offer.event_name(),
            Self::Answer { .. } => NegotiationKind::Answer.event_name(),
            Self::IceCandidate { .. } => NegotiationKind::IceCandidate.event_name(),
        }
    }
}

/// The three relayed negotiation message kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NegotiationKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    IceCandidate,
}

impl NegotiationKind {
    /// Wire event name.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }
}
