//! Session configuration.
//!
//! Both configs follow the same shape: sensible defaults, chainable `with_*`
//! setters for the handful of knobs embedders actually turn.

use std::time::Duration;

use convene_media_core::{VadConfig, VideoConstraints};

use crate::retry::RetryConfig;

/// Configuration for one-to-one call sessions
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// How long a dialing call waits for an answer or a remote stream before
    /// it gives up with a no-answer outcome
    pub dial_timeout: Duration,
    /// Camera constraints used when the call carries video
    pub video: VideoConstraints,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(30),
            video: VideoConstraints::default(),
        }
    }
}

impl CallConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dial timeout
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the camera constraints for video calls
    pub fn with_video(mut self, video: VideoConstraints) -> Self {
        self.video = video;
        self
    }
}

/// Configuration for voice room sessions
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Voice activity detector threshold and cadence
    pub vad: VadConfig,
    /// Camera constraints used when video is toggled on
    pub video: VideoConstraints,
    /// Retry policy for the relay registration during join
    pub join_retry: RetryConfig,
    /// Whether speaking transitions are broadcast to the room as presence
    /// updates. Local subscribers see them either way.
    pub broadcast_speaking: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            video: VideoConstraints::default(),
            join_retry: RetryConfig::default(),
            broadcast_speaking: true,
        }
    }
}

impl RoomConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the voice activity detector configuration
    pub fn with_vad(mut self, vad: VadConfig) -> Self {
        self.vad = vad;
        self
    }

    /// Set the camera constraints
    pub fn with_video(mut self, video: VideoConstraints) -> Self {
        self.video = video;
        self
    }

    /// Set the join retry policy
    pub fn with_join_retry(mut self, retry: RetryConfig) -> Self {
        self.join_retry = retry;
        self
    }

    /// Enable or disable broadcasting of speaking transitions
    pub fn with_broadcast_speaking(mut self, broadcast: bool) -> Self {
        self.broadcast_speaking = broadcast;
        self
    }
}
