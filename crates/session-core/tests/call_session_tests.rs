//! Integration tests for the one-to-one call state machine, driven through
//! in-process fakes of the relay, devices, and connection engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use convene_media_core::{MediaKind, MediaStream, MediaTrack};
use convene_session_core::{
    CallConfig, CallControl, CallKind, CallOutcome, CallSession, CallState, LinkRole,
    LocalProfile, PeerDescriptor, SessionError, SignalKind, SignalMessage, TransportAddress,
};

use common::{platform, settle, FakeCallLog, FakeConnector, FakeDevices, FakeRelay};

fn alice() -> LocalProfile {
    LocalProfile {
        user_id: "alice".into(),
        display_name: "Alice".into(),
        avatar_ref: None,
    }
}

fn bob() -> PeerDescriptor {
    PeerDescriptor {
        user_id: "bob".into(),
        display_name: "Bob".into(),
        address: TransportAddress::new("bob-conn"),
    }
}

struct Harness {
    relay: Arc<FakeRelay>,
    devices: Arc<FakeDevices>,
    connector: Arc<FakeConnector>,
    call_log: Arc<FakeCallLog>,
}

impl Harness {
    fn new() -> Self {
        Self {
            relay: FakeRelay::new("alice-conn", Vec::new()),
            devices: FakeDevices::new(),
            connector: FakeConnector::new(),
            call_log: FakeCallLog::new(),
        }
    }

    fn platform(&self) -> convene_session_core::Platform {
        platform(&self.relay, &self.devices, &self.connector, &self.call_log)
    }

    async fn dial(&self, kind: CallKind) -> Arc<CallSession> {
        CallSession::initiate(
            self.platform(),
            alice(),
            TransportAddress::new("alice-conn"),
            bob(),
            kind,
            CallConfig::default(),
        )
        .await
        .expect("dial should succeed")
    }

    fn ring(&self) -> Arc<CallSession> {
        CallSession::incoming(
            self.platform(),
            alice(),
            TransportAddress::new("alice-conn"),
            bob(),
            CallKind::Audio,
            json!({ "sdp": "offer", "from": "bob" }),
            CallConfig::default(),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_dial_times_out_exactly_once() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;
    assert_eq!(session.state(), CallState::Dialing);

    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    assert!(h.devices.all_stopped());
    assert_eq!(h.call_log.record_count(), 1);
    let record = h.call_log.last().unwrap();
    assert_eq!(record.outcome, CallOutcome::NoAnswer);
    assert_eq!(record.duration_seconds, 0);

    // A later hang-up is a no-op: the record is never emitted twice.
    session.end().await.unwrap();
    settle().await;
    assert_eq!(h.call_log.record_count(), 1);
}

#[tokio::test]
async fn device_denial_fails_fast_with_no_state() {
    let h = Harness::new();
    h.devices.deny_audio.store(true, std::sync::atomic::Ordering::SeqCst);

    let result = CallSession::initiate(
        h.platform(),
        alice(),
        TransportAddress::new("alice-conn"),
        bob(),
        CallKind::Audio,
        CallConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::PermissionDenied { .. })));
    assert_eq!(h.connector.created_count(), 0);
    assert!(h.relay.sent_controls.lock().is_empty());
    settle().await;
    assert_eq!(h.call_log.record_count(), 0);
}

#[tokio::test]
async fn camera_denial_releases_the_microphone() {
    let h = Harness::new();
    h.devices.deny_video.store(true, std::sync::atomic::Ordering::SeqCst);

    let result = CallSession::initiate(
        h.platform(),
        alice(),
        TransportAddress::new("alice-conn"),
        bob(),
        CallKind::Video,
        CallConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::PermissionDenied { .. })));
    assert!(h.devices.all_stopped());
    assert_eq!(h.connector.created_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_stream_activates_a_dialing_call() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    let connection = h.connector.connection_to("bob-conn").unwrap();
    assert_eq!(connection.role, LinkRole::Initiator);
    connection.emit_remote_stream(MediaStream::new(vec![MediaTrack::new(
        MediaKind::Audio,
        "bob-mic",
    )]));
    settle().await;

    assert_eq!(session.state(), CallState::Active);
    assert!(session.active_since().is_some());
    assert!(session.remote_stream().is_some());

    // The dial timer was cleared: thirty more seconds end nothing.
    tokio::time::advance(Duration::from_secs(31)).await;
    settle().await;
    assert_eq!(session.state(), CallState::Active);
    assert_eq!(h.call_log.record_count(), 0);

    session.end().await.unwrap();
    settle().await;
    assert_eq!(h.call_log.last().unwrap().outcome, CallOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn answered_control_clears_the_dial_timeout() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    session.handle_control(CallControl::Answered).await.unwrap();
    assert_eq!(session.state(), CallState::Active);

    tokio::time::advance(Duration::from_secs(31)).await;
    settle().await;
    assert_eq!(session.state(), CallState::Active);
    assert_eq!(h.call_log.record_count(), 0);
}

#[tokio::test]
async fn answer_signal_feeds_the_link_and_activates() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    session
        .handle_signal(SignalMessage {
            kind: SignalKind::Answer,
            payload: json!({ "sdp": "answer" }),
            from: bob().address,
            to: TransportAddress::new("alice-conn"),
        })
        .await
        .unwrap();

    let connection = h.connector.connection_to("bob-conn").unwrap();
    assert!(connection.accepted_answer.lock().is_some());
    assert_eq!(session.state(), CallState::Active);
}

#[tokio::test]
async fn answering_an_incoming_call_is_optimistically_active() {
    let h = Harness::new();
    let session = h.ring();
    assert_eq!(session.state(), CallState::Ringing);

    session.answer().await.unwrap();

    // Active from local negotiation start, before any remote stream.
    assert_eq!(session.state(), CallState::Active);
    assert!(session.active_since().is_some());
    assert!(session.remote_stream().is_none());

    let connection = h.connector.connection_to("bob-conn").unwrap();
    assert_eq!(connection.role, LinkRole::Responder);
    assert_eq!(
        connection.accepted_offer.lock().as_ref().unwrap()["sdp"],
        "offer"
    );

    let signals = h.relay.sent_signals.lock().clone();
    assert!(signals.iter().any(|m| m.kind == SignalKind::Answer));
    let controls = h.relay.sent_controls.lock().clone();
    assert!(controls
        .iter()
        .any(|(_, c)| matches!(c, CallControl::Answered)));
}

#[tokio::test]
async fn rejecting_a_ringing_call_emits_a_rejected_record() {
    let h = Harness::new();
    let session = h.ring();

    session.reject().await.unwrap();
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    let record = h.call_log.last().unwrap();
    assert_eq!(record.outcome, CallOutcome::Rejected);
    assert_eq!(record.duration_seconds, 0);
    let controls = h.relay.sent_controls.lock().clone();
    assert!(controls
        .iter()
        .any(|(_, c)| matches!(c, CallControl::Rejected)));
}

#[tokio::test]
async fn remote_rejection_ends_a_dialing_call() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    session.handle_control(CallControl::Rejected).await.unwrap();
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    assert_eq!(h.call_log.last().unwrap().outcome, CallOutcome::Rejected);
    assert!(h.devices.all_stopped());
}

#[tokio::test]
async fn hanging_up_before_an_answer_is_a_cancellation() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    session.end().await.unwrap();
    settle().await;

    let record = h.call_log.last().unwrap();
    assert_eq!(record.outcome, CallOutcome::Cancelled);
    assert_eq!(record.duration_seconds, 0);
    let controls = h.relay.sent_controls.lock().clone();
    assert!(controls
        .iter()
        .any(|(_, c)| matches!(c, CallControl::HangUp)));
}

#[tokio::test]
async fn remote_hangup_while_ringing_is_a_cancellation() {
    let h = Harness::new();
    let session = h.ring();

    session.handle_control(CallControl::HangUp).await.unwrap();
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    assert_eq!(h.call_log.last().unwrap().outcome, CallOutcome::Cancelled);
}

#[tokio::test]
async fn peer_failure_converges_on_connection_error() {
    let h = Harness::new();
    let session = h.dial(CallKind::Audio).await;

    let connection = h.connector.connection_to("bob-conn").unwrap();
    connection.emit_failed("ice disconnected");
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    assert!(connection.is_closed());
    assert!(h.devices.all_stopped());
    assert_eq!(
        h.call_log.last().unwrap().outcome,
        CallOutcome::ConnectionError
    );

    // Teardown paths are pairwise idempotent.
    session.end().await.unwrap();
    settle().await;
    assert_eq!(h.call_log.record_count(), 1);
}

#[tokio::test]
async fn local_candidates_are_relayed_to_the_peer() {
    let h = Harness::new();
    let _session = h.dial(CallKind::Audio).await;

    let connection = h.connector.connection_to("bob-conn").unwrap();
    connection.emit_local_candidate(json!({ "candidate": "udp 1" }));
    settle().await;

    let signals = h.relay.sent_signals.lock().clone();
    let candidate = signals
        .iter()
        .find(|m| m.kind == SignalKind::Candidate)
        .expect("candidate should be relayed");
    assert_eq!(candidate.to, bob().address);
    assert_eq!(candidate.from, TransportAddress::new("alice-conn"));
}

#[tokio::test]
async fn a_failing_log_sink_never_blocks_teardown() {
    let h = Harness::new();
    h.call_log.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    let session = h.dial(CallKind::Audio).await;

    session.end().await.unwrap();
    settle().await;

    assert_eq!(session.state(), CallState::Ended);
    assert!(h.devices.all_stopped());
    assert_eq!(h.call_log.record_count(), 0);
}

#[tokio::test]
async fn video_call_negotiates_both_tracks() {
    let h = Harness::new();
    let session = h.dial(CallKind::Video).await;

    let connection = h.connector.connection_to("bob-conn").unwrap();
    assert_eq!(connection.local_stream.len(), 2);
    assert!(connection.local_stream.has_kind(MediaKind::Audio));
    assert!(connection.local_stream.has_kind(MediaKind::Video));

    let controls = h.relay.sent_controls.lock().clone();
    assert!(controls.iter().any(|(to, c)| {
        *to == bob().address && matches!(c, CallControl::Invite { kind: CallKind::Video, .. })
    }));

    let info = session.info();
    assert_eq!(info.kind, CallKind::Video);
    assert_eq!(info.state, CallState::Dialing);
}
