//! Core type definitions shared by calls and rooms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque per-connection routing id handed out by the signaling relay
///
/// Two sessions of the same user have different transport addresses; the
/// address is the key for everything peer-scoped (participants, links,
/// signal routing).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportAddress(String);

impl TransportAddress {
    /// Wrap a relay-issued routing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw routing id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransportAddress {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a voice room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a room identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presence flags carried for every participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantFlags {
    /// Microphone disabled (track kept attached, transmitting silence)
    pub is_muted: bool,
    /// Camera track currently negotiated
    pub is_video_on: bool,
    /// Screen or camera-doc share currently active
    pub is_screen_sharing: bool,
    /// Voice activity detected on the microphone
    pub is_speaking: bool,
}

/// One member of a room, local or remote
///
/// Remote media for a participant is owned by the peer link that received it;
/// the room only hands out read-only stream references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Stable user identity
    pub user_id: String,
    /// Name shown in rosters
    pub display_name: String,
    /// Avatar image reference, if the user has one
    pub avatar_ref: Option<String>,
    /// Relay routing id for this participant's connection
    pub address: TransportAddress,
    /// Current presence flags
    pub flags: ParticipantFlags,
}

/// The local user's identity, supplied when joining a room or placing a call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProfile {
    /// Stable user identity
    pub user_id: String,
    /// Name shown to other participants
    pub display_name: String,
    /// Avatar image reference, if any
    pub avatar_ref: Option<String>,
}

/// Identity of the remote party of a one-to-one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDescriptor {
    /// Stable user identity
    pub user_id: String,
    /// Display name, when known at call time
    pub display_name: String,
    /// Relay routing id to reach the peer
    pub address: TransportAddress,
}

/// Whether a call carries audio only or audio plus camera video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Microphone only
    Audio,
    /// Microphone and camera
    Video,
}

/// How a finished call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Ended normally by either side after being active
    Completed,
    /// The remote party never answered within the dial timeout
    NoAnswer,
    /// The remote party declined
    Rejected,
    /// Torn down locally before becoming active
    Cancelled,
    /// A peer connection or negotiation failure ended the call
    ConnectionError,
}

/// Record handed to the call-log collaborator after every call teardown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// The remote party's user id
    pub peer_id: String,
    /// Audio or video call
    pub kind: CallKind,
    /// Active time in seconds; zero when the call never became active
    pub duration_seconds: u64,
    /// How the call ended
    pub outcome: CallOutcome,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When teardown ran
    pub ended_at: DateTime<Utc>,
}
