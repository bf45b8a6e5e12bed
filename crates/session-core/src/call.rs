//! One-to-one call sessions.
//!
//! A [`CallSession`] drives a single peer link through the
//! `Idle -> Dialing -> (Ringing) -> Active -> Ended` lifecycle. The caller
//! constructs it with [`CallSession::initiate`]; the callee with
//! [`CallSession::incoming`] when the relay delivers an invite. The embedder
//! routes call-scoped relay traffic in through [`CallSession::handle_signal`]
//! and [`CallSession::handle_control`]; everything else is internal.
//!
//! Every terminal path (hang up, reject, dial timeout, peer failure)
//! converges on one idempotent teardown that stops local tracks, destroys the
//! link, emits the call record, and lands in [`CallState::Ended`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use convene_media_core::{MediaStream, MediaStreamComposer};

use crate::config::CallConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::CallEvent;
use crate::peer::{PeerEvent, PeerLink};
use crate::platform::Platform;
use crate::signaling::{CallControl, SignalKind, SignalMessage};
use crate::types::{
    CallKind, CallOutcome, CallRecord, LocalProfile, PeerDescriptor, TransportAddress,
};

/// Unique identifier for a call session
pub type CallId = Uuid;

/// Lifecycle states of a one-to-one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Created but not yet dialing or ringing
    Idle,
    /// Invite sent, waiting for the remote party to answer
    Dialing,
    /// Invite received, waiting for the local user to answer or reject
    Ringing,
    /// Media negotiation has begun on this side
    Active,
    /// Torn down; terminal
    Ended,
}

/// Point-in-time snapshot of a call for UIs
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// Session identifier
    pub id: CallId,
    /// Current lifecycle state
    pub state: CallState,
    /// The local user
    pub local: LocalProfile,
    /// The remote party
    pub peer: PeerDescriptor,
    /// Audio or video call
    pub kind: CallKind,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When local negotiation began, if it has
    pub active_since: Option<DateTime<Utc>>,
    /// Whether the remote party's media has arrived
    pub has_remote_stream: bool,
}

/// A one-to-one call to a single remote party
pub struct CallSession {
    id: CallId,
    platform: Platform,
    local: LocalProfile,
    local_address: TransportAddress,
    peer: PeerDescriptor,
    kind: CallKind,
    config: CallConfig,
    started_at: DateTime<Utc>,

    state: parking_lot::Mutex<CallState>,
    active_since: parking_lot::Mutex<Option<DateTime<Utc>>>,
    // The pending offer is owned by the session, scoped to its lifetime.
    pending_offer: parking_lot::Mutex<Option<serde_json::Value>>,
    local_stream: parking_lot::Mutex<Option<MediaStream>>,
    remote_stream: parking_lot::Mutex<Option<MediaStream>>,
    link: parking_lot::Mutex<Option<Arc<PeerLink>>>,
    dial_timeout: parking_lot::Mutex<Option<JoinHandle<()>>>,
    peer_events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    events: broadcast::Sender<CallEvent>,
    ended: AtomicBool,
}

impl CallSession {
    /// Place a call to `peer`.
    ///
    /// Local media is acquired first: a permission denial or missing device
    /// fails the call before any session state exists, and nothing is left to
    /// clean up. On success the invite, carrying the local description, is
    /// sent and the dial timeout starts.
    pub async fn initiate(
        platform: Platform,
        local: LocalProfile,
        local_address: TransportAddress,
        peer: PeerDescriptor,
        kind: CallKind,
        config: CallConfig,
    ) -> SessionResult<Arc<Self>> {
        let local_stream = acquire_call_media(&platform, kind, &config).await?;

        let session = Self::new_session(platform, local, local_address, peer, kind, config);
        *session.local_stream.lock() = Some(local_stream.clone());
        session.set_state(CallState::Dialing, Some("dialing"));

        match session.start_dialing(local_stream).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.teardown(CallOutcome::ConnectionError, "dial setup failed").await;
                Err(e)
            }
        }
    }

    /// Register an incoming call from `peer`.
    ///
    /// The offer is stored on the session and the state moves to ringing; no
    /// media is acquired until the local user answers. Must be called from
    /// within a tokio runtime.
    pub fn incoming(
        platform: Platform,
        local: LocalProfile,
        local_address: TransportAddress,
        peer: PeerDescriptor,
        kind: CallKind,
        offer: serde_json::Value,
        config: CallConfig,
    ) -> Arc<Self> {
        let session = Self::new_session(platform, local, local_address, peer, kind, config);
        *session.pending_offer.lock() = Some(offer);
        session.set_state(CallState::Ringing, Some("incoming call"));
        session
    }

    fn new_session(
        platform: Platform,
        local: LocalProfile,
        local_address: TransportAddress,
        peer: PeerDescriptor,
        kind: CallKind,
        config: CallConfig,
    ) -> Arc<Self> {
        let (peer_events, peer_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            platform,
            local,
            local_address,
            peer,
            kind,
            config,
            started_at: Utc::now(),
            state: parking_lot::Mutex::new(CallState::Idle),
            active_since: parking_lot::Mutex::new(None),
            pending_offer: parking_lot::Mutex::new(None),
            local_stream: parking_lot::Mutex::new(None),
            remote_stream: parking_lot::Mutex::new(None),
            link: parking_lot::Mutex::new(None),
            dial_timeout: parking_lot::Mutex::new(None),
            peer_events,
            events,
            ended: AtomicBool::new(false),
        });
        Self::spawn_pump(&session, peer_rx);
        session
    }

    async fn start_dialing(self: &Arc<Self>, local_stream: MediaStream) -> SessionResult<()> {
        let (link, offer) = PeerLink::initiate(
            &self.platform.connector,
            self.peer.address.clone(),
            local_stream,
            self.peer_events.clone(),
        )
        .await?;
        *self.link.lock() = Some(Arc::new(link));

        self.platform
            .relay
            .send_call_control(&self.peer.address, CallControl::Invite { kind: self.kind, offer })
            .await?;

        self.arm_dial_timeout();
        tracing::info!(call_id = %self.id, peer = %self.peer.address, kind = ?self.kind, "call invite sent");
        Ok(())
    }

    /// Answer a ringing call.
    ///
    /// Acquires local media matching the offered kind, answers the stored
    /// offer, and moves to active immediately: activeness is defined by local
    /// negotiation start, not by remote stream arrival, so UI state reflects
    /// being in the call optimistically. A media failure leaves the session
    /// ringing so the user can retry or reject.
    pub async fn answer(&self) -> SessionResult<()> {
        if *self.state.lock() != CallState::Ringing {
            return Err(SessionError::invalid_state("answer requires a ringing call"));
        }

        let local_stream = acquire_call_media(&self.platform, self.kind, &self.config).await?;

        let offer = match self.pending_offer.lock().take() {
            Some(offer) => offer,
            None => {
                local_stream.stop_all();
                return Err(SessionError::invalid_state("no pending offer to answer"));
            }
        };

        let (link, answer) = match PeerLink::respond(
            &self.platform.connector,
            self.peer.address.clone(),
            local_stream.clone(),
            offer,
            self.peer_events.clone(),
        )
        .await
        {
            Ok(created) => created,
            Err(e) => {
                local_stream.stop_all();
                self.teardown(CallOutcome::ConnectionError, "answer negotiation failed").await;
                return Err(e);
            }
        };

        *self.local_stream.lock() = Some(local_stream);
        *self.link.lock() = Some(Arc::new(link));

        let sent = async {
            self.platform
                .relay
                .send_signal(SignalMessage {
                    kind: SignalKind::Answer,
                    payload: answer,
                    from: self.local_address.clone(),
                    to: self.peer.address.clone(),
                })
                .await?;
            self.platform
                .relay
                .send_call_control(&self.peer.address, CallControl::Answered)
                .await
        }
        .await;
        if let Err(e) = sent {
            self.teardown(CallOutcome::ConnectionError, "answer delivery failed").await;
            return Err(e);
        }

        self.mark_active("answered locally");
        Ok(())
    }

    /// Hang up the call.
    ///
    /// A call that was active completes; one still dialing is cancelled.
    /// Safe to call at any point, including after the session already ended.
    pub async fn end(&self) -> SessionResult<()> {
        if self.ended.load(Ordering::SeqCst) {
            return Ok(());
        }
        let outcome = if self.active_since.lock().is_some() {
            CallOutcome::Completed
        } else {
            CallOutcome::Cancelled
        };
        if let Err(e) = self
            .platform
            .relay
            .send_call_control(&self.peer.address, CallControl::HangUp)
            .await
        {
            tracing::warn!(peer = %self.peer.address, error = %e, "hang-up signal not delivered");
        }
        self.teardown(outcome, "ended locally").await;
        Ok(())
    }

    /// Decline a ringing call
    pub async fn reject(&self) -> SessionResult<()> {
        if *self.state.lock() != CallState::Ringing {
            return Err(SessionError::invalid_state("reject requires a ringing call"));
        }
        if let Err(e) = self
            .platform
            .relay
            .send_call_control(&self.peer.address, CallControl::Rejected)
            .await
        {
            tracing::warn!(peer = %self.peer.address, error = %e, "reject signal not delivered");
        }
        self.teardown(CallOutcome::Rejected, "rejected locally").await;
        Ok(())
    }

    /// Feed an inbound negotiation message addressed to this call
    pub async fn handle_signal(&self, message: SignalMessage) -> SessionResult<()> {
        if self.ended.load(Ordering::SeqCst) {
            return Ok(());
        }
        let link = self.link.lock().clone();
        match message.kind {
            SignalKind::Answer => {
                let link = link
                    .ok_or_else(|| SessionError::invalid_state("answer before dialing"))?;
                if let Err(e) = link.handle_signal(&message).await {
                    self.teardown(CallOutcome::ConnectionError, "answer not accepted").await;
                    return Err(e);
                }
                self.mark_active("remote answered");
                Ok(())
            }
            SignalKind::Candidate => match link {
                Some(link) => link.handle_signal(&message).await,
                // Candidates can trail the link's teardown; drop them.
                None => {
                    tracing::debug!(peer = %message.from, "candidate without a link dropped");
                    Ok(())
                }
            },
            SignalKind::Offer => {
                tracing::warn!(peer = %message.from, "unexpected offer for an established call");
                Ok(())
            }
        }
    }

    /// Feed an inbound call-control message addressed to this call
    pub async fn handle_control(&self, control: CallControl) -> SessionResult<()> {
        if self.ended.load(Ordering::SeqCst) {
            return Ok(());
        }
        match control {
            CallControl::Answered => {
                if *self.state.lock() == CallState::Dialing {
                    self.mark_active("remote answered");
                }
                Ok(())
            }
            CallControl::Rejected => {
                self.teardown(CallOutcome::Rejected, "rejected by remote party").await;
                Ok(())
            }
            CallControl::HangUp => {
                let outcome = if self.active_since.lock().is_some() {
                    CallOutcome::Completed
                } else {
                    CallOutcome::Cancelled
                };
                self.teardown(outcome, "hang-up from remote party").await;
                Ok(())
            }
            CallControl::Invite { .. } => {
                tracing::warn!(peer = %self.peer.address, "duplicate invite ignored");
                Ok(())
            }
        }
    }

    /// Subscribe to call events
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    /// Session identifier
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> CallState {
        *self.state.lock()
    }

    /// Whether the session has reached its terminal state
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// When local negotiation began, if it has
    pub fn active_since(&self) -> Option<DateTime<Utc>> {
        *self.active_since.lock()
    }

    /// The local media negotiated into the call, if acquired
    pub fn local_stream(&self) -> Option<MediaStream> {
        self.local_stream.lock().clone()
    }

    /// The remote party's media, if it has arrived
    pub fn remote_stream(&self) -> Option<MediaStream> {
        self.remote_stream.lock().clone()
    }

    /// Snapshot of the session for UIs
    pub fn info(&self) -> CallInfo {
        CallInfo {
            id: self.id,
            state: self.state(),
            local: self.local.clone(),
            peer: self.peer.clone(),
            kind: self.kind,
            started_at: self.started_at,
            active_since: self.active_since(),
            has_remote_stream: self.remote_stream.lock().is_some(),
        }
    }

    /// The pump ends on its own: it breaks once teardown has run, once the
    /// engine sender side is gone, or once the session itself is dropped.
    fn spawn_pump(session: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<(TransportAddress, PeerEvent)>) {
        let weak = Arc::downgrade(session);
        tokio::spawn(async move {
            while let Some((address, event)) = rx.recv().await {
                let Some(session) = weak.upgrade() else { break };
                session.on_peer_event(address, event).await;
                if session.ended.load(Ordering::SeqCst) {
                    break;
                }
            }
        });
    }

    async fn on_peer_event(&self, address: TransportAddress, event: PeerEvent) {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                let message = SignalMessage {
                    kind: SignalKind::Candidate,
                    payload: candidate,
                    from: self.local_address.clone(),
                    to: address,
                };
                if let Err(e) = self.platform.relay.send_signal(message).await {
                    tracing::warn!(peer = %self.peer.address, error = %e, "candidate not relayed");
                }
            }
            PeerEvent::RemoteStream(stream) => {
                if let Some(link) = self.link.lock().clone() {
                    link.set_remote_stream(stream.clone());
                }
                *self.remote_stream.lock() = Some(stream.clone());
                let _ = self.events.send(CallEvent::RemoteStreamAttached { stream });
                self.mark_active("remote stream arrived");
            }
            PeerEvent::Failed { reason } => {
                tracing::warn!(peer = %self.peer.address, reason = %reason, "peer connection failed");
                self.teardown(CallOutcome::ConnectionError, &reason).await;
            }
            PeerEvent::Closed => {
                tracing::debug!(peer = %self.peer.address, "peer connection closed");
            }
        }
    }

    fn arm_dial_timeout(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let timeout = self.config.dial_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(session) = weak.upgrade() else { return };
            // The timer retires its own handle so teardown has nothing to abort.
            session.dial_timeout.lock().take();
            if *session.state.lock() == CallState::Dialing {
                session.teardown(CallOutcome::NoAnswer, "dial timeout").await;
            }
        });
        *self.dial_timeout.lock() = Some(task);
    }

    /// Move to active. The timestamp is set exactly once, on the first
    /// answered/stream signal; later calls only clear the dial timer.
    fn mark_active(&self, reason: &str) {
        if self.ended.load(Ordering::SeqCst) {
            return;
        }
        if let Some(timer) = self.dial_timeout.lock().take() {
            timer.abort();
        }
        {
            let mut active_since = self.active_since.lock();
            if active_since.is_none() {
                *active_since = Some(Utc::now());
            }
        }
        if !matches!(*self.state.lock(), CallState::Active | CallState::Ended) {
            self.set_state(CallState::Active, Some(reason));
        }
    }

    /// The single teardown every terminal path converges on. Runs at most
    /// once; later invocations are no-ops.
    async fn teardown(&self, outcome: CallOutcome, reason: &str) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(timer) = self.dial_timeout.lock().take() {
            timer.abort();
        }

        let duration_seconds = self
            .active_since
            .lock()
            .map(|since| (Utc::now() - since).num_seconds().max(0) as u64)
            .unwrap_or(0);

        let link = self.link.lock().take();
        if let Some(link) = link {
            link.destroy().await;
        }
        if let Some(stream) = self.local_stream.lock().take() {
            stream.stop_all();
        }
        self.remote_stream.lock().take();
        self.pending_offer.lock().take();

        self.set_state(CallState::Ended, Some(reason));

        let record = CallRecord {
            peer_id: self.peer.user_id.clone(),
            kind: self.kind,
            duration_seconds,
            outcome,
            started_at: self.started_at,
            ended_at: Utc::now(),
        };
        tracing::info!(
            call_id = %self.id,
            peer = %self.peer.address,
            outcome = ?outcome,
            duration_seconds,
            reason,
            "call ended"
        );
        let _ = self.events.send(CallEvent::Ended { record: record.clone() });

        // Fire-and-forget: a logging failure never blocks or reverses teardown.
        let sink = self.platform.call_log.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(record).await {
                tracing::warn!(error = %e, "call log sink rejected record");
            }
        });
    }

    fn set_state(&self, next: CallState, reason: Option<&str>) {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            if previous == next {
                return;
            }
            *state = next;
            previous
        };
        tracing::debug!(previous = ?previous, state = ?next, reason, "call state changed");
        let _ = self.events.send(CallEvent::StateChanged {
            previous,
            state: next,
            reason: reason.map(String::from),
            timestamp: Utc::now(),
        });
    }
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("peer", &self.peer.address)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// Acquire the local media a call of `kind` needs, releasing the microphone
/// again if the camera fails so nothing leaks from a half-acquired set
async fn acquire_call_media(
    platform: &Platform,
    kind: CallKind,
    config: &CallConfig,
) -> SessionResult<MediaStream> {
    let audio = platform.devices.acquire_audio().await?;
    match kind {
        CallKind::Audio => Ok(audio),
        CallKind::Video => match platform.devices.acquire_video(config.video.clone()).await {
            Ok(video) => Ok(MediaStreamComposer::compose(&audio, &video)),
            Err(e) => {
                audio.stop_all();
                Err(e.into())
            }
        },
    }
}
