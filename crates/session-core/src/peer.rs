//! Peer links: one negotiated connection to one remote participant.
//!
//! The underlying connection engine (ICE, SDP, transport) is a platform
//! capability behind [`PeerConnector`] / [`PeerConnection`]. A [`PeerLink`]
//! pins down everything this layer cares about: the remote address, the
//! initiator/responder role fixed at creation, the local stream that was
//! negotiated in, the remote stream the link received, and an idempotent
//! destroy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use convene_media_core::{MediaStream, MediaTrack};

use crate::error::{SessionError, SessionResult};
use crate::signaling::{SignalKind, SignalMessage};
use crate::types::TransportAddress;

/// Which side of the connection created the offer. Decided once, at link
/// creation, from room-membership order; never renegotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// This side creates the offer
    Initiator,
    /// This side answers an offer it received
    Responder,
}

/// Events emitted by the connection engine, delivered on the channel the
/// owner supplied at creation, keyed by the remote address
#[derive(Debug)]
pub enum PeerEvent {
    /// A locally gathered transport candidate that must be relayed to the
    /// remote side
    LocalCandidate(serde_json::Value),
    /// The remote side's media arrived
    RemoteStream(MediaStream),
    /// The connection failed and will not recover
    Failed {
        /// Engine-level detail
        reason: String,
    },
    /// The connection closed normally
    Closed,
}

/// Factory for platform peer connections
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Create a connection toward `target` carrying `local_stream`.
    /// Engine events for this connection are sent on `events`, tagged with
    /// `target` so one channel can serve a whole mesh.
    async fn create_connection(
        &self,
        target: &TransportAddress,
        role: LinkRole,
        local_stream: MediaStream,
        events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    ) -> SessionResult<Box<dyn PeerConnection>>;
}

/// One platform peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Produce the local offer. Initiator side only.
    async fn create_offer(&self) -> SessionResult<serde_json::Value>;

    /// Apply a remote offer and produce the local answer. Responder side only.
    async fn accept_offer(&self, offer: serde_json::Value) -> SessionResult<serde_json::Value>;

    /// Apply the remote answer to our offer
    async fn accept_answer(&self, answer: serde_json::Value) -> SessionResult<()>;

    /// Apply a remote transport candidate
    async fn add_remote_candidate(&self, candidate: serde_json::Value) -> SessionResult<()>;

    /// Add a local track without a full renegotiation (used for screen share)
    async fn add_track(&self, track: &MediaTrack) -> SessionResult<()>;

    /// Close the connection. Must be safe to call more than once.
    async fn close(&self);
}

/// One live link to one remote participant
pub struct PeerLink {
    target: TransportAddress,
    role: LinkRole,
    connection: Box<dyn PeerConnection>,
    local_stream: MediaStream,
    // Sync mutex: holders never await with the guard taken.
    remote_stream: parking_lot::Mutex<Option<MediaStream>>,
    destroyed: AtomicBool,
}

impl PeerLink {
    /// Create an initiating link and return it with the offer to relay
    pub async fn initiate(
        connector: &Arc<dyn PeerConnector>,
        target: TransportAddress,
        local_stream: MediaStream,
        events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    ) -> SessionResult<(Self, serde_json::Value)> {
        let connection = connector
            .create_connection(&target, LinkRole::Initiator, local_stream.clone(), events)
            .await?;
        let offer = connection.create_offer().await?;
        tracing::debug!(target = %target, "initiating peer link");
        Ok((
            Self {
                target,
                role: LinkRole::Initiator,
                connection,
                local_stream,
                remote_stream: parking_lot::Mutex::new(None),
                destroyed: AtomicBool::new(false),
            },
            offer,
        ))
    }

    /// Create a responding link for a received offer and return it with the
    /// answer to relay
    pub async fn respond(
        connector: &Arc<dyn PeerConnector>,
        target: TransportAddress,
        local_stream: MediaStream,
        offer: serde_json::Value,
        events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    ) -> SessionResult<(Self, serde_json::Value)> {
        let connection = connector
            .create_connection(&target, LinkRole::Responder, local_stream.clone(), events)
            .await?;
        let answer = connection.accept_offer(offer).await?;
        tracing::debug!(target = %target, "responding peer link");
        Ok((
            Self {
                target,
                role: LinkRole::Responder,
                connection,
                local_stream,
                remote_stream: parking_lot::Mutex::new(None),
                destroyed: AtomicBool::new(false),
            },
            answer,
        ))
    }

    /// The remote participant this link connects to
    pub fn target(&self) -> &TransportAddress {
        &self.target
    }

    /// Role fixed at creation
    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Whether this side created the offer
    pub fn is_initiator(&self) -> bool {
        self.role == LinkRole::Initiator
    }

    /// The local stream negotiated into this link
    pub fn local_stream(&self) -> &MediaStream {
        &self.local_stream
    }

    /// The remote stream this link received, if it has arrived
    pub fn remote_stream(&self) -> Option<MediaStream> {
        self.remote_stream.lock().clone()
    }

    /// Record the remote stream delivered by the engine
    pub fn set_remote_stream(&self, stream: MediaStream) {
        *self.remote_stream.lock() = Some(stream);
    }

    /// Feed an inbound answer or candidate into the connection
    ///
    /// Offers are not handled here: an inbound offer means the remote side is
    /// rebuilding, and the owner must destroy this link and respond on a
    /// fresh one.
    pub async fn handle_signal(&self, message: &SignalMessage) -> SessionResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(SessionError::invalid_state("link already destroyed"));
        }
        match message.kind {
            SignalKind::Answer => self.connection.accept_answer(message.payload.clone()).await,
            SignalKind::Candidate => {
                self.connection
                    .add_remote_candidate(message.payload.clone())
                    .await
            }
            SignalKind::Offer => Err(SessionError::invalid_state(
                "offer for an existing link must rebuild it",
            )),
        }
    }

    /// Add a local track to the running connection without rebuilding it
    pub async fn add_track(&self, track: &MediaTrack) -> SessionResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(SessionError::invalid_state("link already destroyed"));
        }
        self.connection.add_track(track).await
    }

    /// Close the connection and drop the remote stream reference.
    /// Idempotent: the second and later calls are no-ops.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(target = %self.target, "destroying peer link");
        self.connection.close().await;
        self.remote_stream.lock().take();
    }

    /// Whether destroy has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("target", &self.target)
            .field("role", &self.role)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
