//! Voice activity detection over a local audio track.
//!
//! The detector samples the frequency-domain energy the platform publishes on
//! the track, on a fixed cadence, and reports only transitions across the
//! threshold. Edge-triggering keeps presence chatter proportional to actual
//! speech boundaries rather than to the sampling rate.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::track::MediaTrack;

/// Fixed detector configuration. Local only, never negotiated with peers.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Normalized energy (0.0-1.0) above which the track counts as speech
    pub threshold: f32,
    /// How often the track energy is sampled
    pub sample_interval: Duration,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            sample_interval: Duration::from_millis(100),
        }
    }
}

/// Edge-triggered speaking detector for one local audio track
///
/// Emits `true` when the energy first crosses above the threshold and `false`
/// when it first falls back below; a steady level produces no further events.
/// The sampling task ends on its own when the track stops, or when
/// [`VoiceActivityDetector::stop`] is called.
pub struct VoiceActivityDetector {
    task: JoinHandle<()>,
}

impl VoiceActivityDetector {
    /// Start sampling the given track. Returns the detector handle and the
    /// receiver of speaking transitions.
    pub fn start(track: MediaTrack, config: VadConfig) -> (Self, mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::sample_loop(track, config, tx));
        (Self { task }, rx)
    }

    async fn sample_loop(track: MediaTrack, config: VadConfig, tx: mpsc::UnboundedSender<bool>) {
        let mut ticker = tokio::time::interval(config.sample_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut speaking = false;

        loop {
            ticker.tick().await;
            if track.is_stopped() {
                break;
            }
            let energy = track.frequency_energy();
            let now_speaking = track.is_enabled() && energy > config.threshold;
            if now_speaking != speaking {
                speaking = now_speaking;
                tracing::trace!(energy, speaking, "voice activity transition");
                if tx.send(speaking).is_err() {
                    break;
                }
            }
        }
    }

    /// Stop sampling. Idempotent.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for VoiceActivityDetector {
    fn drop(&mut self) {
        self.task.abort();
    }
}
