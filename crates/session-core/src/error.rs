//! Error taxonomy for session coordination.

use thiserror::Error;

use crate::types::TransportAddress;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by call and room sessions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The user or platform denied access to a capture device
    #[error("Permission denied for {device}")]
    PermissionDenied {
        /// Which device was requested
        device: String,
    },

    /// The requested capture device does not exist or cannot be opened
    #[error("Device unavailable: {device}: {reason}")]
    DeviceUnavailable {
        /// Which device was requested
        device: String,
        /// Why acquisition failed
        reason: String,
    },

    /// The signaling relay could not be reached or dropped the connection
    #[error("Signaling relay unreachable: {reason}")]
    SignalingUnreachable {
        /// Transport-level detail
        reason: String,
    },

    /// Establishing or renegotiating a peer connection failed
    #[error("Peer negotiation with {address} failed: {reason}")]
    PeerNegotiationFailed {
        /// The remote party the link was for
        address: TransportAddress,
        /// Engine-level detail
        reason: String,
    },

    /// The remote party never answered within the dial timeout
    #[error("No answer from remote party")]
    NoAnswer,

    /// The remote party declined the call
    #[error("Call rejected by remote party")]
    Rejected,

    /// The operation was cancelled before completing
    #[error("Operation cancelled")]
    Cancelled,

    /// The session is not in a state that permits the operation
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What was attempted and why it is not allowed
        message: String,
    },

    /// A referenced participant, link, or session does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },
}

impl SessionError {
    /// Invalid-state error with a message
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState { message: message.into() }
    }

    /// Relay unreachability with a reason
    pub fn signaling_unreachable(reason: impl Into<String>) -> Self {
        Self::SignalingUnreachable { reason: reason.into() }
    }

    /// Negotiation failure for a specific remote
    pub fn negotiation_failed(address: TransportAddress, reason: impl Into<String>) -> Self {
        Self::PeerNegotiationFailed {
            address,
            reason: reason.into(),
        }
    }

    /// Whether retrying the operation may succeed without user action.
    /// Only transport-level relay failures qualify; device denials and state
    /// errors never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SignalingUnreachable { .. })
    }
}

impl From<convene_media_core::MediaError> for SessionError {
    fn from(err: convene_media_core::MediaError) -> Self {
        use convene_media_core::MediaError;
        match err {
            MediaError::PermissionDenied { device } => Self::PermissionDenied { device },
            MediaError::DeviceUnavailable { device, reason } => {
                Self::DeviceUnavailable { device, reason }
            }
            MediaError::TrackEnded => Self::invalid_state("track has ended"),
        }
    }
}
