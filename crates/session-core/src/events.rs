//! Typed event surfaces for embedding UIs.
//!
//! Sessions publish on `tokio::sync::broadcast` channels; subscribers that
//! fall behind lose oldest events first, which is the right trade for UI
//! state that can always be re-read from the session accessors.

use chrono::{DateTime, Utc};

use convene_media_core::MediaStream;

use crate::call::CallState;
use crate::types::{CallRecord, Participant, ParticipantFlags, TransportAddress};

/// Events published by a one-to-one call session
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The call moved to a new state
    StateChanged {
        /// State before the transition
        previous: CallState,
        /// State after the transition
        state: CallState,
        /// Why the transition happened (e.g. "remote answered", "dial timeout")
        reason: Option<String>,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },
    /// The remote party's media arrived
    RemoteStreamAttached {
        /// The remote stream, shared read-only
        stream: MediaStream,
    },
    /// Teardown finished; carries the record handed to the call log
    Ended {
        /// The final call record
        record: CallRecord,
    },
}

/// Events published by a voice room session
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A participant appeared, either from the join roster or later
    ParticipantJoined {
        /// The new participant
        participant: Participant,
    },
    /// A participant left; their links and streams are already released
    ParticipantLeft {
        /// Address the participant was keyed under
        address: TransportAddress,
    },
    /// A remote participant's media arrived or was replaced
    RemoteStream {
        /// Whose media
        address: TransportAddress,
        /// The stream, shared read-only
        stream: MediaStream,
    },
    /// A participant's presence flags changed (including our own)
    PresenceChanged {
        /// Whose flags
        address: TransportAddress,
        /// The complete new flag set
        flags: ParticipantFlags,
    },
    /// One peer link failed and was removed; the room continues
    LinkFailed {
        /// Whose link
        address: TransportAddress,
        /// Engine-level detail
        reason: String,
    },
    /// The relay connection dropped; signaling is unreachable until the
    /// embedder re-joins
    SignalingLost {
        /// Transport-level detail
        reason: String,
    },
    /// The session left the room and released everything
    Left,
}
