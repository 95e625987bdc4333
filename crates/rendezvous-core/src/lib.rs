//! # rendezvous-core
//!
//! Room pairing and message routing for WebRTC-style session negotiation.
//!
//! - [`rooms::RoomTable`]: room id → at most two sessions, atomic per room
//! - Pairing (`join`): capacity check and the one-time `user-joined` / `other-user` exchange
//! - Routing (`forward`): addressed relay of offer / answer / ICE candidate payloads
//! - Lifecycle (`leave`, `disconnect`): membership removal and `user-left` notification
//! - [`transport::Transport`]: the delivery seam implemented by the server crate

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
mod lifecycle;
mod pairing;
pub mod protocol;
pub mod rooms;
mod router;
pub mod service;
pub mod transport;

pub use errors::ProtocolError;
pub use ids::{RoomId, SessionId};
pub use protocol::{ClientMessage, NegotiationKind, ServerMessage};
pub use rooms::{JoinOutcome, LeaveOutcome, RoomTable, ROOM_CAPACITY};
pub use service::SignalingService;
pub use transport::Transport;
