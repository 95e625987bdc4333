//! Addressed relay of offer / answer / ICE candidate messages.

use serde_json::Value;
use tracing::debug;

use crate::ids::SessionId;
use crate::protocol::{NegotiationKind, ServerMessage};
use crate::service::SignalingService;
use crate::transport::Transport;

impl<T: Transport> SignalingService<T> {
    /// Relay `payload` of the given kind from `from` to `to`.
    ///
    /// No room lookup and no membership check: any other live session can
    /// be addressed. A message addressed back to its sender is never echoed.
    /// Returns whether the transport accepted the message; an unknown or
    /// closed target is dropped silently.
    pub fn forward(
        &self,
        from: &SessionId,
        kind: NegotiationKind,
        payload: Value,
        to: &SessionId,
    ) -> bool {
        if from == to {
            debug!(kind = kind.event_name(), session_id = %from, "dropping self-addressed message");
            return false;
        }
        let message = ServerMessage::relayed(kind, payload, from.clone());
        let delivered = self.transport.send(to, &message);
        debug!(
            kind = kind.event_name(),
            from = %from,
            to = %to,
            delivered,
            "forwarded negotiation message"
        );
        delivered
    }
}
