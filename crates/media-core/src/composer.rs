//! Side-effect-free composition of track sets into new streams.

use std::collections::HashSet;

use crate::stream::MediaStream;
use crate::track::MediaTrack;

/// Merges track sets into a single stream without mutating the inputs
///
/// The composed stream holds references to the same underlying tracks, so
/// enabling or disabling a track through any handle is still reflected
/// through the composed stream. Duplicate track ids are kept once, first
/// occurrence wins.
///
/// ```
/// use convene_media_core::{MediaKind, MediaStream, MediaStreamComposer, MediaTrack};
///
/// let audio = MediaStream::new(vec![MediaTrack::new(MediaKind::Audio, "mic")]);
/// let video = MediaStream::new(vec![MediaTrack::new(MediaKind::Video, "cam")]);
///
/// let combined = MediaStreamComposer::compose(&audio, &video);
/// assert_eq!(combined.len(), 2);
///
/// // Muting through the original handle is visible through the composition.
/// audio.tracks()[0].set_enabled(false);
/// assert!(!combined.audio_tracks().next().unwrap().is_enabled());
/// ```
pub struct MediaStreamComposer;

impl MediaStreamComposer {
    /// Combine the tracks of two streams into a new stream
    pub fn compose(existing: &MediaStream, added: &MediaStream) -> MediaStream {
        Self::from_tracks(existing.tracks().iter().chain(added.tracks().iter()))
    }

    /// Build a stream from an arbitrary sequence of track references,
    /// dropping duplicates by track id
    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a MediaTrack>) -> MediaStream {
        let mut seen = HashSet::new();
        let merged = tracks
            .into_iter()
            .filter(|t| seen.insert(t.id()))
            .cloned()
            .collect();
        MediaStream::new(merged)
    }
}
