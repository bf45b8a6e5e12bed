//! Stream handles grouping a set of track references.

use uuid::Uuid;

use crate::track::{MediaTrack, TrackId};
use crate::types::MediaKind;

/// Unique identifier for a stream
pub type StreamId = Uuid;

/// An ordered set of track references
///
/// Streams never own track state: dropping a stream does not stop its tracks,
/// and two streams may reference the same track. Cloning a stream clones the
/// handles, not the tracks.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: StreamId,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// Build a stream over the given track handles
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    /// Stream identifier
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// All tracks in the stream
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Tracks of one kind
    pub fn tracks_of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    /// Audio tracks
    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks_of_kind(MediaKind::Audio)
    }

    /// Camera and screen tracks
    pub fn visual_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind().is_visual())
    }

    /// Whether the stream contains a track of the given kind
    pub fn has_kind(&self, kind: MediaKind) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    /// Whether the stream contains a track with the given id
    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.iter().any(|t| t.id() == id)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Stop every track in the stream. Idempotent per track.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
