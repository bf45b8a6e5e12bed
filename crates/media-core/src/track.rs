//! Track handles over shared platform capture state.
//!
//! A [`MediaTrack`] is a cheap-to-clone handle: every clone (and every stream
//! that references the track) observes the same enabled/stopped state. This is
//! what lets a composed stream reflect a mute toggled through the original
//! handle, and what lets "one release, everywhere" hold for stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use crate::types::MediaKind;

/// Unique identifier for a track
pub type TrackId = Uuid;

struct TrackInner {
    id: TrackId,
    kind: MediaKind,
    label: String,
    /// Whether the track produces media toward peers. A disabled track stays
    /// attached to its connections and transmits silence/blackness.
    enabled: AtomicBool,
    /// Whether the local sink plays this track out. Only meaningful for
    /// remote audio; flipping it never changes what the remote party sends.
    playback_enabled: AtomicBool,
    stopped: AtomicBool,
    ended_tx: watch::Sender<bool>,
    /// Latest frequency-domain magnitude bins published by the platform
    /// analyser, 0-255 per bin. Empty until the platform publishes.
    frequency_bins: Mutex<Vec<u8>>,
}

/// Handle to one audio, video, or screen capture track
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live track of the given kind
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        let (ended_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackInner {
                id: Uuid::new_v4(),
                kind,
                label: label.into(),
                enabled: AtomicBool::new(true),
                playback_enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                ended_tx,
                frequency_bins: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Track identifier
    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    /// What this track carries
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Human-readable source label
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the track currently produces media toward peers
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable production without detaching the track from any
    /// connection. Visible through every clone and every composed stream.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the local sink plays this track out
    pub fn is_playback_enabled(&self) -> bool {
        self.inner.playback_enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable local playback of this track. Purely a sink-side
    /// switch; the remote party keeps sending either way.
    pub fn set_playback_enabled(&self, enabled: bool) {
        self.inner.playback_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the track has been stopped
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop the track and release its capture source. Idempotent; observers
    /// registered through [`MediaTrack::ended`] fire on the first stop only.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!(track_id = %self.inner.id, kind = ?self.inner.kind, "track stopped");
            let _ = self.inner.ended_tx.send(true);
        }
    }

    /// Watch for the end of this track. The receiver yields `true` once the
    /// track stops, whether through [`MediaTrack::stop`] or a native
    /// "capture ended" event from the platform (e.g. the user pressing the
    /// browser's stop-sharing button, which the platform reports by calling
    /// `stop` on its handle).
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.inner.ended_tx.subscribe()
    }

    /// Publish the latest frequency-domain magnitude bins for this track.
    /// Called by the platform's audio analyser; consumed by the voice
    /// activity detector.
    pub fn publish_frequency_bins(&self, bins: &[u8]) {
        let mut slot = self.inner.frequency_bins.lock();
        slot.clear();
        slot.extend_from_slice(bins);
    }

    /// Mean energy of the last published frequency bins, normalized to 0.0-1.0.
    /// Returns 0.0 when nothing has been published yet.
    pub fn frequency_energy(&self) -> f32 {
        let bins = self.inner.frequency_bins.lock();
        if bins.is_empty() {
            return 0.0;
        }
        let sum: u32 = bins.iter().map(|b| *b as u32).sum();
        sum as f32 / bins.len() as f32 / 255.0
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
