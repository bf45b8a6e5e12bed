//! Picture-in-picture source selection.
//!
//! Exactly one video source is surfaced in the floating preview at any time.
//! Selection is a pure priority pick; the controller applies the pick to a
//! platform surface and retargets whenever the top choice changes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::stream::{MediaStream, StreamId};

/// Where a candidate video source comes from. Declaration order is priority
/// order: a remote screen share always wins, a local screen share only shows
/// when nothing else does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipOrigin {
    /// A remote participant's screen or document share
    RemoteScreen,
    /// A remote participant's camera
    RemoteCamera,
    /// The local camera
    LocalCamera,
    /// The local screen share
    LocalScreen,
}

/// One candidate source for the floating preview
#[derive(Debug, Clone)]
pub struct PipCandidate {
    /// The stream to surface if this candidate wins
    pub stream: MediaStream,
    /// Origin, which doubles as priority
    pub origin: PipOrigin,
}

/// Pick the single most relevant source, or `None` when there is nothing to
/// show. Ties within an origin go to the earliest candidate in the slice.
pub fn select_pip_source(candidates: &[PipCandidate]) -> Option<&PipCandidate> {
    candidates.iter().min_by_key(|c| c.origin)
}

/// Platform primitive that presents one stream in a floating preview
#[async_trait]
pub trait PipSurface: Send + Sync {
    /// Show the given stream in the preview, replacing whatever was shown
    async fn attach(&self, stream: &MediaStream);
    /// Hide the preview
    async fn detach(&self);
}

/// Keeps the platform surface pointed at the current top-priority source
pub struct PipController {
    surface: Arc<dyn PipSurface>,
    current: Mutex<Option<StreamId>>,
}

impl PipController {
    /// Wrap a platform surface
    pub fn new(surface: Arc<dyn PipSurface>) -> Self {
        Self {
            surface,
            current: Mutex::new(None),
        }
    }

    /// Stream currently attached to the preview, if any
    pub async fn current(&self) -> Option<StreamId> {
        *self.current.lock().await
    }

    /// Re-evaluate the candidate set. Attaches the winner if it differs from
    /// what is currently shown, detaches when no candidate remains.
    pub async fn refresh(&self, candidates: &[PipCandidate]) {
        let mut current = self.current.lock().await;
        match select_pip_source(candidates) {
            Some(winner) => {
                if *current != Some(winner.stream.id()) {
                    tracing::debug!(origin = ?winner.origin, stream = %winner.stream.id(), "retargeting pip preview");
                    self.surface.attach(&winner.stream).await;
                    *current = Some(winner.stream.id());
                }
            }
            None => {
                if current.take().is_some() {
                    self.surface.detach().await;
                }
            }
        }
    }

    /// Detach the preview unconditionally
    pub async fn clear(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            self.surface.detach().await;
        }
    }
}
