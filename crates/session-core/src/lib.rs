//! Real-time session coordination for the convene communication core.
//!
//! Two independent top-level managers share the same peer-link plumbing:
//!
//! - [`CallSession`] - a one-to-one call state machine
//!   (`Idle -> Dialing -> (Ringing) -> Active -> Ended`) owning a single
//!   [`PeerLink`], a dial timeout, and the call record handed to the
//!   [`CallLogSink`] on teardown.
//! - [`VoiceRoomSession`] - a multi-party room manager on a mesh topology:
//!   one [`PeerLink`] per remote participant, local media state shared across
//!   all of them, voice activity detection, and presence broadcasting.
//!
//! Everything outside this crate is reached through the traits bundled in
//! [`Platform`]: the [`SignalingRelay`], the capture devices, the peer
//! connection engine, and the call log. Media primitives (tracks, streams,
//! composition, VAD, picture-in-picture selection) live in
//! [`convene_media_core`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use convene_session_core::{CallConfig, CallKind, CallSession, LocalProfile,
//!     PeerDescriptor, Platform, TransportAddress};
//!
//! # async fn place_call(platform: Platform) -> convene_session_core::SessionResult<()> {
//! let session = CallSession::initiate(
//!     platform,
//!     LocalProfile {
//!         user_id: "alice".into(),
//!         display_name: "Alice".into(),
//!         avatar_ref: None,
//!     },
//!     TransportAddress::new("conn-1"),
//!     PeerDescriptor {
//!         user_id: "bob".into(),
//!         display_name: "Bob".into(),
//!         address: TransportAddress::new("conn-2"),
//!     },
//!     CallKind::Audio,
//!     CallConfig::new().with_dial_timeout(Duration::from_secs(30)),
//! )
//! .await?;
//!
//! let mut events = session.subscribe();
//! # let _ = events;
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod events;
pub mod peer;
pub mod platform;
pub mod retry;
pub mod room;
pub mod signaling;
pub mod types;

pub use call::{CallId, CallInfo, CallSession, CallState};
pub use config::{CallConfig, RoomConfig};
pub use error::{SessionError, SessionResult};
pub use events::{CallEvent, RoomEvent};
pub use peer::{LinkRole, PeerConnection, PeerConnector, PeerEvent, PeerLink};
pub use platform::{CallLogSink, Platform};
pub use retry::{retry_with_backoff, RetryConfig};
pub use room::{RoomStats, VoiceRoomSession};
pub use signaling::{
    CallControl, PresenceUpdate, RelayEvent, RosterSnapshot, SignalKind, SignalMessage,
    SignalingRelay,
};
pub use types::{
    CallKind, CallOutcome, CallRecord, LocalProfile, Participant, ParticipantFlags,
    PeerDescriptor, RoomId, TransportAddress,
};
