//! The platform capture boundary.
//!
//! Everything above this trait treats device acquisition as an opaque,
//! fallible, asynchronous capability. Acquisition failures map to
//! [`MediaError::PermissionDenied`] or [`MediaError::DeviceUnavailable`]
//! and are surfaced before any session state is created.
//!
//! [`MediaError::PermissionDenied`]: crate::error::MediaError::PermissionDenied
//! [`MediaError::DeviceUnavailable`]: crate::error::MediaError::DeviceUnavailable

use async_trait::async_trait;

use crate::error::MediaResult;
use crate::stream::MediaStream;
use crate::types::{ScreenShareMode, VideoConstraints};

/// Platform capability for acquiring capture devices
///
/// Implementations wrap whatever the host platform provides (getUserMedia,
/// CoreAudio, PipeWire, a test fake). Acquisition may prompt the user and is
/// therefore unbounded in time; callers decide whether to attach timeouts.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a microphone stream containing one live audio track
    async fn acquire_audio(&self) -> MediaResult<MediaStream>;

    /// Acquire a camera stream containing one live video track
    async fn acquire_video(&self, constraints: VideoConstraints) -> MediaResult<MediaStream>;

    /// Acquire a display-capture stream
    ///
    /// For [`ScreenShareMode::CameraDoc`] the implementation opens a
    /// rear-facing camera instead of capturing a display; the returned
    /// stream still carries screen-kind tracks so the rest of the stack
    /// treats both uniformly.
    async fn acquire_display(&self, mode: ScreenShareMode) -> MediaResult<MediaStream>;
}
