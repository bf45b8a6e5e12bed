//! In-process fakes for the platform boundaries.
//!
//! Each fake records what the session did to it and lets the test inject the
//! inbound traffic a real platform would deliver.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use convene_media_core::{
    MediaDevices, MediaError, MediaKind, MediaResult, MediaStream, MediaTrack, ScreenShareMode,
    VideoConstraints,
};
use convene_session_core::{
    CallControl, CallLogSink, CallRecord, LinkRole, Participant, ParticipantFlags, PeerConnection,
    PeerConnector, PeerEvent, Platform, PresenceUpdate, RelayEvent, RoomId, RosterSnapshot,
    SessionError, SessionResult, SignalMessage, SignalingRelay, TransportAddress,
};

/// Let spawned tasks (event pumps, fire-and-forget sinks) run to quiescence.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn participant(user: &str, address: &str) -> Participant {
    Participant {
        user_id: user.to_string(),
        display_name: user.to_string(),
        avatar_ref: None,
        address: TransportAddress::new(address),
        flags: ParticipantFlags::default(),
    }
}

pub fn platform(
    relay: &Arc<FakeRelay>,
    devices: &Arc<FakeDevices>,
    connector: &Arc<FakeConnector>,
    call_log: &Arc<FakeCallLog>,
) -> Platform {
    Platform {
        relay: relay.clone(),
        devices: devices.clone(),
        connector: connector.clone(),
        call_log: call_log.clone(),
    }
}

// ===== signaling relay =====

pub struct FakeRelay {
    local_address: TransportAddress,
    roster: Mutex<Vec<Participant>>,
    fail_joins: AtomicU32,
    pub join_attempts: AtomicU32,
    event_tx: Mutex<Option<mpsc::UnboundedSender<RelayEvent>>>,
    pub sent_signals: Mutex<Vec<SignalMessage>>,
    pub sent_controls: Mutex<Vec<(TransportAddress, CallControl)>>,
    pub presence: Mutex<Vec<PresenceUpdate>>,
    pub left_rooms: Mutex<Vec<RoomId>>,
}

impl FakeRelay {
    pub fn new(local_address: &str, roster: Vec<Participant>) -> Arc<Self> {
        Arc::new(Self {
            local_address: TransportAddress::new(local_address),
            roster: Mutex::new(roster),
            fail_joins: AtomicU32::new(0),
            join_attempts: AtomicU32::new(0),
            event_tx: Mutex::new(None),
            sent_signals: Mutex::new(Vec::new()),
            sent_controls: Mutex::new(Vec::new()),
            presence: Mutex::new(Vec::new()),
            left_rooms: Mutex::new(Vec::new()),
        })
    }

    /// Make the next `n` join attempts fail as unreachable
    pub fn fail_next_joins(&self, n: u32) {
        self.fail_joins.store(n, Ordering::SeqCst);
    }

    /// Deliver an inbound event to the joined session
    pub fn deliver(&self, event: RelayEvent) {
        let tx = self.event_tx.lock();
        tx.as_ref()
            .expect("no session has joined this relay")
            .send(event)
            .expect("session event pump is gone");
    }

    /// Offers sent by the session, in order
    pub fn sent_offers(&self) -> Vec<SignalMessage> {
        self.sent_signals
            .lock()
            .iter()
            .filter(|m| matches!(m.kind, convene_session_core::SignalKind::Offer))
            .cloned()
            .collect()
    }

    pub fn last_presence(&self) -> Option<PresenceUpdate> {
        self.presence.lock().last().cloned()
    }
}

#[async_trait]
impl SignalingRelay for FakeRelay {
    async fn join(
        &self,
        _room: &RoomId,
        _profile: &convene_session_core::LocalProfile,
    ) -> SessionResult<(RosterSnapshot, mpsc::UnboundedReceiver<RelayEvent>)> {
        self.join_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_joins.load(Ordering::SeqCst) > 0 {
            self.fail_joins.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::signaling_unreachable("relay offline"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.event_tx.lock() = Some(tx);
        Ok((
            RosterSnapshot {
                local_address: self.local_address.clone(),
                participants: self.roster.lock().clone(),
            },
            rx,
        ))
    }

    async fn leave(&self, room: &RoomId) -> SessionResult<()> {
        self.left_rooms.lock().push(room.clone());
        Ok(())
    }

    async fn send_signal(&self, message: SignalMessage) -> SessionResult<()> {
        self.sent_signals.lock().push(message);
        Ok(())
    }

    async fn send_call_control(
        &self,
        to: &TransportAddress,
        control: CallControl,
    ) -> SessionResult<()> {
        self.sent_controls.lock().push((to.clone(), control));
        Ok(())
    }

    async fn broadcast_presence(&self, _room: &RoomId, update: PresenceUpdate) -> SessionResult<()> {
        self.presence.lock().push(update);
        Ok(())
    }
}

// ===== capture devices =====

pub struct FakeDevices {
    pub deny_audio: AtomicBool,
    pub deny_video: AtomicBool,
    pub deny_display: AtomicBool,
    pub acquired: Mutex<Vec<MediaStream>>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deny_audio: AtomicBool::new(false),
            deny_video: AtomicBool::new(false),
            deny_display: AtomicBool::new(false),
            acquired: Mutex::new(Vec::new()),
        })
    }

    fn checked_out(&self, stream: MediaStream) -> MediaStream {
        self.acquired.lock().push(stream.clone());
        stream
    }

    /// Whether every track ever handed out has been stopped
    pub fn all_stopped(&self) -> bool {
        self.acquired
            .lock()
            .iter()
            .all(|s| s.tracks().iter().all(|t| t.is_stopped()))
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.lock().len()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn acquire_audio(&self) -> MediaResult<MediaStream> {
        if self.deny_audio.load(Ordering::SeqCst) {
            return Err(MediaError::permission_denied("microphone"));
        }
        Ok(self.checked_out(MediaStream::new(vec![MediaTrack::new(
            MediaKind::Audio,
            "fake-mic",
        )])))
    }

    async fn acquire_video(&self, _constraints: VideoConstraints) -> MediaResult<MediaStream> {
        if self.deny_video.load(Ordering::SeqCst) {
            return Err(MediaError::permission_denied("camera"));
        }
        Ok(self.checked_out(MediaStream::new(vec![MediaTrack::new(
            MediaKind::Video,
            "fake-cam",
        )])))
    }

    async fn acquire_display(&self, mode: ScreenShareMode) -> MediaResult<MediaStream> {
        if self.deny_display.load(Ordering::SeqCst) {
            return Err(MediaError::device_unavailable("display", "capture unsupported"));
        }
        let label = match mode {
            ScreenShareMode::Screen => "fake-screen",
            ScreenShareMode::Window => "fake-window",
            ScreenShareMode::CameraDoc => "fake-doc-cam",
        };
        Ok(self.checked_out(MediaStream::new(vec![MediaTrack::new(
            MediaKind::Screen,
            label,
        )])))
    }
}

// ===== peer connection engine =====

pub struct FakeConnection {
    pub target: TransportAddress,
    pub role: LinkRole,
    pub local_stream: MediaStream,
    events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    pub accepted_offer: Mutex<Option<serde_json::Value>>,
    pub accepted_answer: Mutex<Option<serde_json::Value>>,
    pub remote_candidates: Mutex<Vec<serde_json::Value>>,
    pub added_tracks: Mutex<Vec<MediaTrack>>,
    pub closed: AtomicBool,
}

impl FakeConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Inject the arrival of the remote party's media
    pub fn emit_remote_stream(&self, stream: MediaStream) {
        let _ = self
            .events
            .send((self.target.clone(), PeerEvent::RemoteStream(stream)));
    }

    /// Inject an unrecoverable connection failure
    pub fn emit_failed(&self, reason: &str) {
        let _ = self.events.send((
            self.target.clone(),
            PeerEvent::Failed {
                reason: reason.to_string(),
            },
        ));
    }

    /// Inject a locally gathered candidate
    pub fn emit_local_candidate(&self, candidate: serde_json::Value) {
        let _ = self
            .events
            .send((self.target.clone(), PeerEvent::LocalCandidate(candidate)));
    }
}

struct ConnectionHandle(Arc<FakeConnection>);

#[async_trait]
impl PeerConnection for ConnectionHandle {
    async fn create_offer(&self) -> SessionResult<serde_json::Value> {
        Ok(json!({ "sdp": "offer", "to": self.0.target.as_str() }))
    }

    async fn accept_offer(&self, offer: serde_json::Value) -> SessionResult<serde_json::Value> {
        *self.0.accepted_offer.lock() = Some(offer);
        Ok(json!({ "sdp": "answer", "to": self.0.target.as_str() }))
    }

    async fn accept_answer(&self, answer: serde_json::Value) -> SessionResult<()> {
        *self.0.accepted_answer.lock() = Some(answer);
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: serde_json::Value) -> SessionResult<()> {
        self.0.remote_candidates.lock().push(candidate);
        Ok(())
    }

    async fn add_track(&self, track: &MediaTrack) -> SessionResult<()> {
        self.0.added_tracks.lock().push(track.clone());
        Ok(())
    }

    async fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    pub connections: Mutex<Vec<Arc<FakeConnection>>>,
    pub fail_create: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
        })
    }

    /// Every connection ever created, open or closed
    pub fn all(&self) -> Vec<Arc<FakeConnection>> {
        self.connections.lock().clone()
    }

    /// The most recent connection toward `address`
    pub fn connection_to(&self, address: &str) -> Option<Arc<FakeConnection>> {
        let address = TransportAddress::new(address);
        self.connections
            .lock()
            .iter()
            .rev()
            .find(|c| c.target == address)
            .cloned()
    }

    pub fn live_count(&self) -> usize {
        self.connections.lock().iter().filter(|c| !c.is_closed()).count()
    }

    pub fn created_count(&self) -> usize {
        self.connections.lock().len()
    }
}

#[async_trait]
impl PeerConnector for FakeConnector {
    async fn create_connection(
        &self,
        target: &TransportAddress,
        role: LinkRole,
        local_stream: MediaStream,
        events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    ) -> SessionResult<Box<dyn PeerConnection>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SessionError::negotiation_failed(
                target.clone(),
                "engine refused",
            ));
        }
        let connection = Arc::new(FakeConnection {
            target: target.clone(),
            role,
            local_stream,
            events,
            accepted_offer: Mutex::new(None),
            accepted_answer: Mutex::new(None),
            remote_candidates: Mutex::new(Vec::new()),
            added_tracks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.connections.lock().push(connection.clone());
        Ok(Box::new(ConnectionHandle(connection)))
    }
}

// ===== call log =====

pub struct FakeCallLog {
    pub records: Mutex<Vec<CallRecord>>,
    pub fail: AtomicBool,
}

impl FakeCallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn last(&self) -> Option<CallRecord> {
        self.records.lock().last().cloned()
    }
}

#[async_trait]
impl CallLogSink for FakeCallLog {
    async fn record(&self, record: CallRecord) -> SessionResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::signaling_unreachable("log backend down"));
        }
        self.records.lock().push(record);
        Ok(())
    }
}
