//! Multi-party voice rooms over a full mesh.
//!
//! Every participant holds one peer link to every other participant; there is
//! no central media server. A [`VoiceRoomSession`] owns the local media state
//! shared across all links, reacts to roster changes, and keeps the mesh
//! consistent as members join, leave, mute, add video, or share a screen.
//!
//! Glare is avoided by membership order: the longer-tenured side of every
//! pair initiates, decided once at link creation by [`link_role`] and never
//! renegotiated. A newcomer therefore creates no links on join; it answers
//! the offers existing members send, creating each responding link lazily on
//! the first inbound offer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use convene_media_core::{
    MediaKind, MediaStream, MediaStreamComposer, PipCandidate, PipOrigin, ScreenShareMode,
    TrackId, VoiceActivityDetector,
};

use crate::config::RoomConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::RoomEvent;
use crate::peer::{LinkRole, PeerEvent, PeerLink};
use crate::platform::Platform;
use crate::retry::retry_with_backoff;
use crate::signaling::{PresenceUpdate, RelayEvent, SignalKind, SignalMessage};
use crate::types::{LocalProfile, Participant, ParticipantFlags, RoomId, TransportAddress};

/// Initiator/responder assignment for one pair, from room-membership order.
///
/// The longer-tenured side initiates, so both ends of every pair agree on
/// their roles without a runtime negotiation and never race to offer.
pub(crate) fn link_role(local_seq: u64, remote_seq: u64) -> LinkRole {
    if local_seq < remote_seq {
        LinkRole::Initiator
    } else {
        LinkRole::Responder
    }
}

/// Counters for room introspection
#[derive(Debug, Clone, Copy)]
pub struct RoomStats {
    /// Remote participants currently known
    pub participant_count: usize,
    /// Peer links currently live
    pub link_count: usize,
    /// Links created over the life of the session, rebuilds included
    pub total_links_created: u64,
}

struct MemberEntry {
    participant: Participant,
    join_seq: u64,
}

struct ScreenShare {
    mode: ScreenShareMode,
    stream: MediaStream,
}

/// A session in one voice room
pub struct VoiceRoomSession {
    platform: Platform,
    room_id: RoomId,
    profile: LocalProfile,
    local_address: TransportAddress,
    config: RoomConfig,
    local_seq: u64,

    members: DashMap<TransportAddress, MemberEntry>,
    links: DashMap<TransportAddress, Arc<PeerLink>>,
    next_seq: AtomicU64,

    local_audio: MediaStream,
    local_video: parking_lot::Mutex<Option<MediaStream>>,
    local_screen: parking_lot::Mutex<Option<ScreenShare>>,
    flags: parking_lot::Mutex<ParticipantFlags>,
    deafened: AtomicBool,

    peer_events: mpsc::UnboundedSender<(TransportAddress, PeerEvent)>,
    events: broadcast::Sender<RoomEvent>,
    vad: parking_lot::Mutex<Option<VoiceActivityDetector>>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    total_links_created: AtomicU64,
    left: AtomicBool,
}

impl VoiceRoomSession {
    /// Join a room.
    ///
    /// The microphone is acquired first and the relay registration is retried
    /// on transient failures; if either ultimately fails, everything acquired
    /// so far is released and no room state is observable. Existing members
    /// initiate toward us once the relay announces our arrival, so no links
    /// are created here.
    pub async fn join(
        platform: Platform,
        room_id: RoomId,
        profile: LocalProfile,
        config: RoomConfig,
    ) -> SessionResult<Arc<Self>> {
        let local_audio = platform.devices.acquire_audio().await?;

        let joined = retry_with_backoff("room join", config.join_retry.clone(), || {
            platform.relay.join(&room_id, &profile)
        })
        .await;
        let (roster, relay_rx) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                local_audio.stop_all();
                return Err(e);
            }
        };

        let (peer_events, peer_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(128);
        let local_seq = roster.participants.len() as u64;

        let session = Arc::new(Self {
            platform,
            room_id,
            profile,
            local_address: roster.local_address,
            config,
            local_seq,
            members: DashMap::new(),
            links: DashMap::new(),
            next_seq: AtomicU64::new(local_seq + 1),
            local_audio,
            local_video: parking_lot::Mutex::new(None),
            local_screen: parking_lot::Mutex::new(None),
            flags: parking_lot::Mutex::new(ParticipantFlags::default()),
            deafened: AtomicBool::new(false),
            peer_events,
            events,
            vad: parking_lot::Mutex::new(None),
            tasks: parking_lot::Mutex::new(Vec::new()),
            total_links_created: AtomicU64::new(0),
            left: AtomicBool::new(false),
        });

        for (index, participant) in roster.participants.iter().enumerate() {
            session.members.insert(
                participant.address.clone(),
                MemberEntry {
                    participant: participant.clone(),
                    join_seq: index as u64,
                },
            );
        }

        let vad_rx = session.start_vad();
        Self::spawn_pump(&session, relay_rx, peer_rx, vad_rx);

        tracing::info!(
            room = %session.room_id,
            address = %session.local_address,
            roster = session.members.len(),
            "joined room"
        );
        Ok(session)
    }

    /// Leave the room, destroying every link and releasing all local media.
    /// Idempotent.
    pub async fn leave(&self) -> SessionResult<()> {
        if self.left.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(room = %self.room_id, "leaving room");

        if let Err(e) = self.platform.relay.leave(&self.room_id).await {
            tracing::warn!(room = %self.room_id, error = %e, "relay leave not delivered");
        }

        let targets: Vec<TransportAddress> =
            self.links.iter().map(|entry| entry.key().clone()).collect();
        for target in targets {
            if let Some((_, link)) = self.links.remove(&target) {
                link.destroy().await;
            }
        }
        self.members.clear();

        if let Some(vad) = self.vad.lock().take() {
            vad.stop();
        }
        if let Some(video) = self.local_video.lock().take() {
            video.stop_all();
        }
        if let Some(share) = self.local_screen.lock().take() {
            share.stream.stop_all();
        }
        self.local_audio.stop_all();

        let _ = self.events.send(RoomEvent::Left);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        Ok(())
    }

    /// Flip the microphone mute flag.
    ///
    /// The audio track stays attached to every link and transmits silence;
    /// nothing is renegotiated. The new flag is broadcast for presence
    /// display only. Returns the new muted state.
    pub async fn toggle_mute(&self) -> SessionResult<bool> {
        self.ensure_joined()?;
        let flags = {
            let mut flags = self.flags.lock();
            flags.is_muted = !flags.is_muted;
            for track in self.local_audio.audio_tracks() {
                track.set_enabled(!flags.is_muted);
            }
            *flags
        };
        tracing::debug!(room = %self.room_id, muted = flags.is_muted, "mute toggled");
        self.publish_flags(flags).await;
        Ok(flags.is_muted)
    }

    /// Flip local playback of every known remote audio track.
    ///
    /// Purely local: remote parties keep sending either way, and the
    /// microphone is unaffected. Tracks that arrive while deafened are
    /// silenced as they arrive. Returns the new deafened state.
    pub fn toggle_deafen(&self) -> bool {
        let deafened = !self.deafened.fetch_xor(true, Ordering::SeqCst);
        for entry in self.links.iter() {
            if let Some(stream) = entry.value().remote_stream() {
                for track in stream.audio_tracks() {
                    track.set_playback_enabled(!deafened);
                }
            }
        }
        tracing::debug!(room = %self.room_id, deafened, "deafen toggled");
        deafened
    }

    /// Turn the camera on or off.
    ///
    /// The track set changes, and add/remove-track renegotiation is avoided
    /// for simplicity: every live link is destroyed and recreated as an
    /// initiator with the recomposed stream. A no-op if the camera is already
    /// in the requested state.
    pub async fn toggle_video(&self, on: bool) -> SessionResult<()> {
        self.ensure_joined()?;
        if self.local_video.lock().is_some() == on {
            return Ok(());
        }

        if on {
            let video = self
                .platform
                .devices
                .acquire_video(self.config.video.clone())
                .await?;
            *self.local_video.lock() = Some(video);
        } else if let Some(video) = self.local_video.lock().take() {
            video.stop_all();
        }

        let flags = {
            let mut flags = self.flags.lock();
            flags.is_video_on = on;
            *flags
        };
        tracing::info!(room = %self.room_id, video = on, "video toggled, rebuilding links");

        self.rebuild_links().await;
        self.publish_flags(flags).await;
        Ok(())
    }

    /// Start sharing a screen, window, or rear-camera document view.
    ///
    /// At most one share exists per session; starting a new one stops the
    /// previous one first. Screen tracks are supplementary to the audio and
    /// video already flowing, so they are added to each live link without a
    /// rebuild. The platform reporting the capture's end (e.g. the user
    /// pressing the native stop button) runs the same cleanup as
    /// [`VoiceRoomSession::stop_screen_share`].
    pub async fn start_screen_share(self: &Arc<Self>, mode: ScreenShareMode) -> SessionResult<()> {
        self.ensure_joined()?;
        if self.local_screen.lock().is_some() {
            self.stop_screen_share().await?;
        }

        let stream = self.platform.devices.acquire_display(mode).await?;
        self.watch_screen_ended(&stream);
        *self.local_screen.lock() = Some(ScreenShare {
            mode,
            stream: stream.clone(),
        });

        let links: Vec<Arc<PeerLink>> =
            self.links.iter().map(|entry| entry.value().clone()).collect();
        for link in links {
            self.attach_screen_tracks(&link).await;
        }

        let flags = {
            let mut flags = self.flags.lock();
            flags.is_screen_sharing = true;
            *flags
        };
        tracing::info!(room = %self.room_id, mode = ?mode, "screen share started");
        self.publish_flags(flags).await;
        Ok(())
    }

    /// Stop the current share and release its tracks, leaving every other
    /// track untouched. Idempotent.
    pub async fn stop_screen_share(&self) -> SessionResult<()> {
        let share = match self.local_screen.lock().take() {
            Some(share) => share,
            None => return Ok(()),
        };
        share.stream.stop_all();

        let flags = {
            let mut flags = self.flags.lock();
            flags.is_screen_sharing = false;
            *flags
        };
        tracing::info!(room = %self.room_id, mode = ?share.mode, "screen share stopped");
        self.publish_flags(flags).await;
        Ok(())
    }

    /// Subscribe to room events
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    /// The room this session belongs to
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The relay address assigned to this session
    pub fn local_address(&self) -> &TransportAddress {
        &self.local_address
    }

    /// The local user's identity as supplied at join
    pub fn local_profile(&self) -> &LocalProfile {
        &self.profile
    }

    /// The local user's presence flags
    pub fn local_flags(&self) -> ParticipantFlags {
        *self.flags.lock()
    }

    /// Whether remote audio playback is currently disabled
    pub fn is_deafened(&self) -> bool {
        self.deafened.load(Ordering::SeqCst)
    }

    /// All currently known remote participants
    pub fn participants(&self) -> Vec<Participant> {
        self.members
            .iter()
            .map(|entry| entry.value().participant.clone())
            .collect()
    }

    /// Number of live peer links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The remote stream received from one participant, if it has arrived
    pub fn remote_stream(&self, address: &TransportAddress) -> Option<MediaStream> {
        self.links
            .get(address)
            .and_then(|link| link.value().remote_stream())
    }

    /// Counters for introspection
    pub fn stats(&self) -> RoomStats {
        RoomStats {
            participant_count: self.members.len(),
            link_count: self.links.len(),
            total_links_created: self.total_links_created.load(Ordering::SeqCst),
        }
    }

    /// Candidate set for the floating preview, every known video source with
    /// its selection priority
    pub fn pip_candidates(&self) -> Vec<PipCandidate> {
        let mut candidates = Vec::new();
        for entry in self.links.iter() {
            if let Some(stream) = entry.value().remote_stream() {
                if stream.has_kind(MediaKind::Screen) {
                    candidates.push(PipCandidate {
                        stream: stream.clone(),
                        origin: PipOrigin::RemoteScreen,
                    });
                } else if stream.has_kind(MediaKind::Video) {
                    candidates.push(PipCandidate {
                        stream,
                        origin: PipOrigin::RemoteCamera,
                    });
                }
            }
        }
        if let Some(video) = self.local_video.lock().clone() {
            candidates.push(PipCandidate {
                stream: video,
                origin: PipOrigin::LocalCamera,
            });
        }
        if let Some(share) = self.local_screen.lock().as_ref() {
            candidates.push(PipCandidate {
                stream: share.stream.clone(),
                origin: PipOrigin::LocalScreen,
            });
        }
        candidates
    }

    fn ensure_joined(&self) -> SessionResult<()> {
        if self.left.load(Ordering::SeqCst) {
            Err(SessionError::invalid_state("room already left"))
        } else {
            Ok(())
        }
    }

    /// The stream negotiated into links: microphone audio, plus camera video
    /// when the camera is on. Screen tracks ride separately via add-track.
    fn negotiated_stream(&self) -> MediaStream {
        match self.local_video.lock().as_ref() {
            Some(video) => MediaStreamComposer::compose(&self.local_audio, video),
            None => self.local_audio.clone(),
        }
    }

    fn start_vad(self: &Arc<Self>) -> mpsc::UnboundedReceiver<bool> {
        let Some(mic) = self.local_audio.audio_tracks().next().cloned() else {
            // No microphone track: hand back a channel that closes right away
            // so the pump disables its speaking branch.
            let (_tx, rx) = mpsc::unbounded_channel();
            return rx;
        };
        let (vad, rx) = VoiceActivityDetector::start(mic, self.config.vad.clone());
        *self.vad.lock() = Some(vad);
        rx
    }

    fn spawn_pump(
        session: &Arc<Self>,
        mut relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
        mut peer_rx: mpsc::UnboundedReceiver<(TransportAddress, PeerEvent)>,
        mut vad_rx: mpsc::UnboundedReceiver<bool>,
    ) {
        let weak = Arc::downgrade(session);
        let task = tokio::spawn(async move {
            let mut vad_open = true;
            loop {
                tokio::select! {
                    event = relay_rx.recv() => {
                        let Some(event) = event else { break };
                        let Some(session) = weak.upgrade() else { break };
                        session.on_relay_event(event).await;
                        if session.left.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    event = peer_rx.recv() => {
                        let Some((address, event)) = event else { break };
                        let Some(session) = weak.upgrade() else { break };
                        session.on_peer_event(address, event).await;
                    }
                    speaking = vad_rx.recv(), if vad_open => {
                        match speaking {
                            Some(speaking) => {
                                let Some(session) = weak.upgrade() else { break };
                                session.on_speaking_changed(speaking).await;
                            }
                            None => vad_open = false,
                        }
                    }
                }
            }
        });
        session.tasks.lock().push(task);
    }

    async fn on_relay_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::UserJoined(participant) => self.on_user_joined(participant).await,
            RelayEvent::UserLeft(address) => self.on_user_left(address).await,
            RelayEvent::Signal(message) => self.on_signal(message).await,
            RelayEvent::Presence(update) => self.on_presence(update),
            RelayEvent::Disconnected { reason } => {
                tracing::warn!(room = %self.room_id, reason = %reason, "signaling relay lost");
                let _ = self.events.send(RoomEvent::SignalingLost { reason });
            }
        }
    }

    async fn on_user_joined(&self, participant: Participant) {
        let address = participant.address.clone();
        let join_seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        tracing::info!(room = %self.room_id, participant = %address, "participant joined");
        self.members.insert(
            address.clone(),
            MemberEntry {
                participant: participant.clone(),
                join_seq,
            },
        );
        let _ = self.events.send(RoomEvent::ParticipantJoined { participant });

        // They arrived after us, so membership order puts the offer on us.
        if link_role(self.local_seq, join_seq) == LinkRole::Initiator {
            if let Err(e) = self.build_initiating_link(address.clone()).await {
                tracing::warn!(room = %self.room_id, participant = %address, error = %e, "link setup failed");
                let _ = self.events.send(RoomEvent::LinkFailed {
                    address,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn on_user_left(&self, address: TransportAddress) {
        tracing::info!(room = %self.room_id, participant = %address, "participant left");
        self.members.remove(&address);
        if let Some((_, link)) = self.links.remove(&address) {
            link.destroy().await;
        }
        let _ = self.events.send(RoomEvent::ParticipantLeft { address });
    }

    async fn on_signal(&self, message: SignalMessage) {
        let from = message.from.clone();
        match message.kind {
            SignalKind::Offer => self.on_remote_offer(from, message.payload).await,
            SignalKind::Answer | SignalKind::Candidate => {
                let link = self.links.get(&from).map(|entry| entry.value().clone());
                match link {
                    Some(link) => {
                        if let Err(e) = link.handle_signal(&message).await {
                            tracing::warn!(room = %self.room_id, participant = %from, error = %e, "signal rejected by link");
                            self.fail_link(from, e.to_string()).await;
                        }
                    }
                    // Signals can trail a link's teardown; drop them.
                    None => {
                        tracing::debug!(room = %self.room_id, participant = %from, kind = ?message.kind, "signal without a link dropped");
                    }
                }
            }
        }
    }

    /// An inbound offer means the remote side is initiating: either we are
    /// the newcomer it must reach, or it rebuilt its track set and is
    /// renegotiating from scratch. Both cases answer on a fresh link.
    async fn on_remote_offer(&self, from: TransportAddress, offer: serde_json::Value) {
        if !self.members.contains_key(&from) {
            tracing::warn!(room = %self.room_id, participant = %from, "offer from unknown participant dropped");
            return;
        }
        // One link per remote: the old link dies before its replacement exists.
        if let Some((_, old)) = self.links.remove(&from) {
            old.destroy().await;
        }

        let stream = self.negotiated_stream();
        let created = PeerLink::respond(
            &self.platform.connector,
            from.clone(),
            stream,
            offer,
            self.peer_events.clone(),
        )
        .await;
        let (link, answer) = match created {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(room = %self.room_id, participant = %from, error = %e, "responding link failed");
                let _ = self.events.send(RoomEvent::LinkFailed {
                    address: from,
                    reason: e.to_string(),
                });
                return;
            }
        };
        let link = Arc::new(link);
        self.attach_screen_tracks(&link).await;

        let message = SignalMessage {
            kind: SignalKind::Answer,
            payload: answer,
            from: self.local_address.clone(),
            to: from.clone(),
        };
        if let Err(e) = self.platform.relay.send_signal(message).await {
            tracing::warn!(room = %self.room_id, participant = %from, error = %e, "answer not relayed");
            link.destroy().await;
            let _ = self.events.send(RoomEvent::LinkFailed {
                address: from,
                reason: e.to_string(),
            });
            return;
        }

        self.links.insert(from, link);
        self.total_links_created.fetch_add(1, Ordering::SeqCst);
    }

    fn on_presence(&self, update: PresenceUpdate) {
        if let Some(mut entry) = self.members.get_mut(&update.from) {
            entry.participant.flags = update.flags;
        }
        let _ = self.events.send(RoomEvent::PresenceChanged {
            address: update.from,
            flags: update.flags,
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
                    tracing::warn!(room = %self.room_id, error = %e, "candidate not relayed");
                }
            }
            PeerEvent::RemoteStream(stream) => {
                if let Some(link) = self.links.get(&address).map(|entry| entry.value().clone()) {
                    link.set_remote_stream(stream.clone());
                }
                if self.deafened.load(Ordering::SeqCst) {
                    for track in stream.audio_tracks() {
                        track.set_playback_enabled(false);
                    }
                }
                let _ = self.events.send(RoomEvent::RemoteStream { address, stream });
            }
            PeerEvent::Failed { reason } => self.fail_link(address, reason).await,
            PeerEvent::Closed => {
                tracing::debug!(room = %self.room_id, participant = %address, "peer connection closed");
            }
        }
    }

    /// A single link's failure removes only that link; the room continues
    /// uninterrupted for everyone else.
    async fn fail_link(&self, address: TransportAddress, reason: String) {
        if let Some((_, link)) = self.links.remove(&address) {
            link.destroy().await;
            tracing::warn!(room = %self.room_id, participant = %address, reason = %reason, "peer link removed after failure");
            let _ = self.events.send(RoomEvent::LinkFailed { address, reason });
        }
    }

    async fn on_speaking_changed(&self, speaking: bool) {
        let flags = {
            let mut flags = self.flags.lock();
            flags.is_speaking = speaking;
            *flags
        };
        let _ = self.events.send(RoomEvent::PresenceChanged {
            address: self.local_address.clone(),
            flags,
        });
        if self.config.broadcast_speaking {
            self.broadcast_flags(flags).await;
        }
    }

    /// Destroy and recreate an initiating link to `target` with the current
    /// negotiated stream, never leaving two links for one remote
    async fn build_initiating_link(&self, target: TransportAddress) -> SessionResult<()> {
        if let Some((_, old)) = self.links.remove(&target) {
            old.destroy().await;
        }

        let stream = self.negotiated_stream();
        let (link, offer) = PeerLink::initiate(
            &self.platform.connector,
            target.clone(),
            stream,
            self.peer_events.clone(),
        )
        .await?;
        let link = Arc::new(link);
        self.attach_screen_tracks(&link).await;

        let message = SignalMessage {
            kind: SignalKind::Offer,
            payload: offer,
            from: self.local_address.clone(),
            to: target.clone(),
        };
        if let Err(e) = self.platform.relay.send_signal(message).await {
            link.destroy().await;
            return Err(e);
        }

        self.links.insert(target, link);
        self.total_links_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rebuild_links(&self) {
        let targets: Vec<TransportAddress> =
            self.links.iter().map(|entry| entry.key().clone()).collect();
        for target in targets {
            if let Err(e) = self.build_initiating_link(target.clone()).await {
                tracing::warn!(room = %self.room_id, participant = %target, error = %e, "link rebuild failed");
                let _ = self.events.send(RoomEvent::LinkFailed {
                    address: target,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Add the current screen tracks, if any, to a link. Additive only:
    /// screen content supplements the negotiated stream, it never replaces it.
    async fn attach_screen_tracks(&self, link: &PeerLink) {
        let tracks: Vec<_> = self
            .local_screen
            .lock()
            .as_ref()
            .map(|share| share.stream.tracks().to_vec())
            .unwrap_or_default();
        for track in &tracks {
            if let Err(e) = link.add_track(track).await {
                tracing::warn!(participant = %link.target(), error = %e, "screen track not added");
            }
        }
    }

    fn watch_screen_ended(self: &Arc<Self>, stream: &MediaStream) {
        let Some(track) = stream.tracks().first().cloned() else {
            return;
        };
        let track_id = track.id();
        let mut ended = track.ended();
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while ended.changed().await.is_ok() {
                if *ended.borrow() {
                    if let Some(session) = weak.upgrade() {
                        session.on_screen_track_ended(track_id).await;
                    }
                    break;
                }
            }
        });
        self.tasks.lock().push(task);
    }

    /// The native "user stopped sharing" path. Only cleans up if the ended
    /// track still belongs to the current share, so a stale watcher from a
    /// replaced share cannot kill its successor.
    async fn on_screen_track_ended(&self, track: TrackId) {
        let is_current = self
            .local_screen
            .lock()
            .as_ref()
            .is_some_and(|share| share.stream.contains(track));
        if is_current {
            tracing::debug!(room = %self.room_id, "screen capture ended by platform");
            let _ = self.stop_screen_share().await;
        }
    }

    async fn publish_flags(&self, flags: ParticipantFlags) {
        let _ = self.events.send(RoomEvent::PresenceChanged {
            address: self.local_address.clone(),
            flags,
        });
        self.broadcast_flags(flags).await;
    }

    async fn broadcast_flags(&self, flags: ParticipantFlags) {
        let update = PresenceUpdate {
            from: self.local_address.clone(),
            flags,
        };
        if let Err(e) = self
            .platform
            .relay
            .broadcast_presence(&self.room_id, update)
            .await
        {
            tracing::warn!(room = %self.room_id, error = %e, "presence broadcast failed");
        }
    }
}

impl std::fmt::Debug for VoiceRoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceRoomSession")
            .field("room", &self.room_id)
            .field("address", &self.local_address)
            .field("participants", &self.members.len())
            .field("links", &self.links.len())
            .finish()
    }
}
