//! Shared media type definitions.

use serde::{Deserialize, Serialize};

/// The kind of content a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    /// Microphone audio
    Audio,
    /// Camera video
    Video,
    /// Display or document capture
    Screen,
}

impl MediaKind {
    /// Whether this kind renders as video (camera or screen content)
    pub fn is_visual(&self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Screen)
    }
}

/// What a screen-share capture should present
///
/// `CameraDoc` requests a rear-facing camera stream as a stand-in for display
/// capture on platforms that cannot capture the screen (e.g. handhelds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenShareMode {
    /// Capture an entire screen
    Screen,
    /// Capture a single window
    Window,
    /// Rear-facing camera pointed at a document, used where display capture
    /// is unsupported
    CameraDoc,
}

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFacing {
    /// Front-facing (user) camera
    User,
    /// Rear-facing (environment) camera
    Environment,
}

/// Constraints for camera acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Requested frame width in pixels
    pub width: u32,
    /// Requested frame height in pixels
    pub height: u32,
    /// Which camera to open
    pub facing: CameraFacing,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing: CameraFacing::User,
        }
    }
}

impl VideoConstraints {
    /// Constraints for a rear-facing capture, used by the camera-doc
    /// screen-share fallback
    pub fn environment() -> Self {
        Self {
            facing: CameraFacing::Environment,
            ..Default::default()
        }
    }
}
