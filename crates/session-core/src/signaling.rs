//! The signaling relay boundary.
//!
//! The relay is an external collaborator: best-effort delivery, ordered per
//! participant pair, nothing persisted. Sessions receive inbound traffic on
//! the receiver returned from [`SignalingRelay::join`]; outbound traffic goes
//! through the trait methods. Relay loss is reported as an event, never as a
//! panic or a torn-down room.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SessionResult;
use crate::types::{
    CallKind, LocalProfile, Participant, ParticipantFlags, RoomId, TransportAddress,
};

/// Negotiation message categories relayed between two participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Session description offer
    Offer,
    /// Session description answer
    Answer,
    /// Transport candidate
    Candidate,
}

/// One point-to-point negotiation message
///
/// The payload is opaque to the session layer; only `kind`, `from`, and `to`
/// are inspected for routing and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Message category
    pub kind: SignalKind,
    /// Engine-defined payload, passed through untouched
    pub payload: serde_json::Value,
    /// Sender's transport address
    pub from: TransportAddress,
    /// Recipient's transport address
    pub to: TransportAddress,
}

/// Call-control messages for one-to-one calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallControl {
    /// Start a call. Carries the caller's initial session description so the
    /// callee can answer without an extra round-trip.
    Invite {
        /// Audio or video call
        kind: CallKind,
        /// The caller's initial offer payload
        offer: serde_json::Value,
    },
    /// The callee accepted and is sending its answer separately
    Answered,
    /// The callee declined
    Rejected,
    /// Either side ended or cancelled the call
    HangUp,
}

/// Presence flag update broadcast to a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Whose flags changed
    pub from: TransportAddress,
    /// The complete new flag set
    pub flags: ParticipantFlags,
}

/// Roster delivered once on room join
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    /// The routing id the relay assigned to this connection
    pub local_address: TransportAddress,
    /// Everyone already in the room, excluding the joiner
    pub participants: Vec<Participant>,
}

/// Inbound traffic delivered by the relay to a joined session
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A participant joined the room after us
    UserJoined(Participant),
    /// A participant left the room
    UserLeft(TransportAddress),
    /// A point-to-point negotiation message addressed to us
    Signal(SignalMessage),
    /// A presence broadcast from another participant
    Presence(PresenceUpdate),
    /// The relay connection dropped; no reconnection is attempted here
    Disconnected {
        /// Transport-level detail
        reason: String,
    },
}

/// External signaling relay used by calls and rooms
///
/// Contract assumed from the transport: messages between any two specific
/// participants arrive in the order sent (offer before answer before
/// candidates); no ordering across different pairs, no delivery guarantee
/// beyond best effort.
#[async_trait]
pub trait SignalingRelay: Send + Sync {
    /// Register in a room. Returns the current roster and the receiver for
    /// all subsequent inbound traffic.
    async fn join(
        &self,
        room: &RoomId,
        profile: &LocalProfile,
    ) -> SessionResult<(RosterSnapshot, mpsc::UnboundedReceiver<RelayEvent>)>;

    /// Deregister from a room
    async fn leave(&self, room: &RoomId) -> SessionResult<()>;

    /// Relay one negotiation message to its recipient
    async fn send_signal(&self, message: SignalMessage) -> SessionResult<()>;

    /// Send a call-control message to a single participant
    async fn send_call_control(
        &self,
        to: &TransportAddress,
        control: CallControl,
    ) -> SessionResult<()>;

    /// Broadcast a presence update to the room
    async fn broadcast_presence(&self, room: &RoomId, update: PresenceUpdate) -> SessionResult<()>;
}
