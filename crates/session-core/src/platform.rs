//! The bundle of external collaborators a session runs against.
//!
//! Everything a call or room touches outside this crate comes through one of
//! these handles: the signaling relay, the capture devices, the peer
//! connection engine, and the call log. Tests swap in fakes; production wires
//! in the real platform once and clones the bundle per session.

use std::sync::Arc;

use async_trait::async_trait;

use convene_media_core::MediaDevices;

use crate::error::SessionResult;
use crate::peer::PeerConnector;
use crate::signaling::SignalingRelay;
use crate::types::CallRecord;

/// External collaborator that receives a [`CallRecord`] after every call
/// teardown
///
/// Invoked fire-and-forget on a spawned task; a sink failure is logged and
/// never blocks or reverses teardown.
#[async_trait]
pub trait CallLogSink: Send + Sync {
    /// Persist one call record
    async fn record(&self, record: CallRecord) -> SessionResult<()>;
}

/// Shared handles to the platform collaborators
///
/// Cheap to clone; sessions hold their own copy for their whole lifetime.
#[derive(Clone)]
pub struct Platform {
    /// Signal relay for negotiation and presence traffic
    pub relay: Arc<dyn SignalingRelay>,
    /// Capture device boundary
    pub devices: Arc<dyn MediaDevices>,
    /// Peer connection engine
    pub connector: Arc<dyn PeerConnector>,
    /// Call history collaborator
    pub call_log: Arc<dyn CallLogSink>,
}
