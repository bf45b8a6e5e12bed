//! Error types for media device acquisition and track handling.

use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors surfaced by the media layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The user or platform denied access to a capture device
    #[error("Permission denied for {device}")]
    PermissionDenied {
        /// Which device was requested (e.g. "microphone", "camera", "display")
        device: String,
    },

    /// The requested device does not exist or cannot be opened
    #[error("Device unavailable: {device}: {reason}")]
    DeviceUnavailable {
        /// Which device was requested
        device: String,
        /// Why acquisition failed
        reason: String,
    },

    /// An operation was attempted on a track that has already been stopped
    #[error("Track has ended")]
    TrackEnded,
}

impl MediaError {
    /// Permission denial for a named device
    pub fn permission_denied(device: impl Into<String>) -> Self {
        Self::PermissionDenied { device: device.into() }
    }

    /// Unavailable device with a reason
    pub fn device_unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }
}
