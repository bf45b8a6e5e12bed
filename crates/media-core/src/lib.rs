//! Media primitives for the convene real-time communication core.
//!
//! This crate owns everything that touches local media state without touching
//! the network: track and stream handles, the device acquisition boundary,
//! side-effect-free stream composition, voice activity detection, and the
//! picture-in-picture source selector.
//!
//! # Architecture
//!
//! - [`MediaTrack`] / [`MediaStream`] - cheap-to-clone handles over shared
//!   track state. Enabling, disabling, or stopping a track is visible through
//!   every stream that references it.
//! - [`MediaDevices`] - the narrow platform boundary for microphone, camera,
//!   and display capture. The session layer only ever talks to this trait.
//! - [`MediaStreamComposer`] - merges track sets into a new stream without
//!   mutating or cloning the underlying tracks.
//! - [`VoiceActivityDetector`] - samples audio energy on a fixed cadence and
//!   reports only speaking/not-speaking transitions.
//! - [`PipController`] - picks exactly one video source for a floating
//!   preview and retargets it as sources come and go.

pub mod composer;
pub mod devices;
pub mod error;
pub mod pip;
pub mod stream;
pub mod track;
pub mod types;
pub mod vad;

pub use composer::MediaStreamComposer;
pub use devices::MediaDevices;
pub use error::{MediaError, MediaResult};
pub use pip::{select_pip_source, PipCandidate, PipController, PipOrigin, PipSurface};
pub use stream::{MediaStream, StreamId};
pub use track::{MediaTrack, TrackId};
pub use types::{CameraFacing, MediaKind, ScreenShareMode, VideoConstraints};
pub use vad::{VadConfig, VoiceActivityDetector};
