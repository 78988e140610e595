//! End-to-end state machine scenarios against collaborator doubles
//!
//! The doubles stand in for the UI, scene, catalog, capture, and audio
//! layers; the transport double lets tests play the generation service
//! and inject wire records synchronously.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use anima_clip::{AudioClip, FaceClip, FaceFrame, MotionClip, MotionFrame};
use anima_core::{AnimaError, AnimaResult, CharacterId};
use anima_playback::Tier;
use anima_session::{
    AssetCatalog, AudioSink, CharacterHandle, Condition, ConversationStateMachine,
    FrontendBridge, LocalClip, Microphone, Notice, SceneController, SessionConfig, SessionDeps,
    SessionState,
};
use anima_transport::{ByteSink, Transport};
use anima_wire::{ElementType, Record};

const JOINTS: [&str; 3] = ["hips", "eye_l", "eye_r"];
const SHAPES: [&str; 2] = ["jawOpen", "smile"];

fn joint_names() -> Vec<String> {
    JOINTS.iter().map(|s| s.to_string()).collect()
}

fn shape_names() -> Vec<String> {
    SHAPES.iter().map(|s| s.to_string()).collect()
}

fn motion_clip(frames: usize) -> MotionClip {
    let data = (0..frames).map(|_| MotionFrame::rest(JOINTS.len())).collect();
    MotionClip::new(joint_names(), data, 0, None, None).unwrap()
}

fn face_clip(frames: usize) -> FaceClip {
    let data = (0..frames)
        .map(|_| FaceFrame::neutral(SHAPES.len()))
        .collect();
    FaceClip::new(shape_names(), data, None).unwrap()
}

// ---- collaborator doubles ----------------------------------------------

struct StubCatalog;

impl AssetCatalog for StubCatalog {
    fn variants(&self, label: &str) -> Vec<LocalClip> {
        match label {
            "idle" | "listen" => vec![LocalClip {
                motion: motion_clip(6),
                face: Some(face_clip(6)),
                loop_range: Some((0, 6)),
            }],
            "interrupted" | "leave" | "error" => vec![LocalClip {
                motion: motion_clip(2),
                face: None,
                loop_range: None,
            }],
            _ => vec![],
        }
    }

    fn sync(&mut self) -> AnimaResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct StubMicrophone {
    capturing: Arc<Mutex<bool>>,
    queued: Arc<Mutex<VecDeque<Bytes>>>,
}

impl Microphone for StubMicrophone {
    fn start(&mut self) -> AnimaResult<()> {
        *self.capturing.lock() = true;
        Ok(())
    }

    fn stop(&mut self) {
        *self.capturing.lock() = false;
    }

    fn drain(&mut self) -> Vec<Bytes> {
        self.queued.lock().drain(..).collect()
    }

    fn is_capturing(&self) -> bool {
        *self.capturing.lock()
    }
}

#[derive(Clone, Default)]
struct StubAudioSink {
    played: Arc<Mutex<Vec<AudioClip>>>,
    flushes: Arc<Mutex<u32>>,
}

impl AudioSink for StubAudioSink {
    fn enqueue(&mut self, clip: &AudioClip) {
        self.played.lock().push(clip.clone());
    }

    fn flush(&mut self) {
        *self.flushes.lock() += 1;
    }
}

#[derive(Clone, Default)]
struct StubFrontend {
    notices: Arc<Mutex<Vec<Notice>>>,
    indicator: Arc<Mutex<bool>>,
    states: Arc<Mutex<Vec<SessionState>>>,
}

impl FrontendBridge for StubFrontend {
    fn show_notice(&mut self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn set_recovery_indicator(&mut self, visible: bool) {
        *self.indicator.lock() = visible;
    }

    fn state_changed(&mut self, state: SessionState) {
        self.states.lock().push(state);
    }
}

struct StubScene;

impl SceneController for StubScene {
    fn spawn_environment(&mut self) -> AnimaResult<()> {
        Ok(())
    }

    fn spawn_character(&mut self, id: CharacterId) -> AnimaResult<CharacterHandle> {
        Ok(CharacterHandle {
            id,
            joint_names: joint_names(),
            blendshape_names: shape_names(),
        })
    }
}

/// Transport double: captures outbound records, lets the test inject
/// inbound bytes synchronously into the client's sink.
#[derive(Clone)]
struct TestTransport {
    sink: Arc<Mutex<Option<ByteSink>>>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    connected: Arc<AtomicBool>,
}

impl TestTransport {
    fn new() -> Arc<Self> {
        Arc::new(TestTransport {
            sink: Arc::new(Mutex::new(None)),
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        })
    }

    fn inject(&self, record: &Record) {
        let bytes = Bytes::from(record.encode());
        if let Some(sink) = self.sink.lock().as_mut() {
            sink(bytes);
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Transport for TestTransport {
    fn send(&self, bytes: Bytes) -> AnimaResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AnimaError::Disconnected);
        }
        self.sent.lock().push(bytes);
        Ok(())
    }

    fn set_sink(&self, sink: ByteSink) {
        *self.sink.lock() = Some(sink);
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        *self.sink.lock() = None;
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ---- harness ------------------------------------------------------------

struct Harness {
    machine: ConversationStateMachine,
    transport: Arc<TestTransport>,
    frontend: StubFrontend,
    audio_sink: StubAudioSink,
    microphone: StubMicrophone,
}

fn config() -> SessionConfig {
    SessionConfig {
        // Thresholds small enough for single-chunk scenarios
        min_audio_secs: 0.0,
        min_motion_frames: 1,
        min_face_frames: 0,
        response_timeout_secs: 60.0,
        generation_ready_timeout_secs: 60.0,
        blend_step: 0.5,
        ..SessionConfig::default()
    }
}

fn harness_with(cfg: SessionConfig) -> Harness {
    let transport = TestTransport::new();
    let frontend = StubFrontend::default();
    let audio_sink = StubAudioSink::default();
    let microphone = StubMicrophone::default();

    let factory_transport = Arc::clone(&transport);
    let deps = SessionDeps {
        transport_factory: Box::new(move || {
            Ok(Arc::clone(&factory_transport) as Arc<dyn Transport>)
        }),
        catalog: Box::new(StubCatalog),
        microphone: Box::new(microphone.clone()),
        audio_sink: Box::new(audio_sink.clone()),
        frontend: Box::new(frontend.clone()),
        scene: Box::new(StubScene),
        progress: anima_core::ProgressTracker::new(),
    };

    Harness {
        machine: ConversationStateMachine::new(cfg, deps),
        transport,
        frontend,
        audio_sink,
        microphone,
    }
}

fn harness() -> Harness {
    harness_with(config())
}

impl Harness {
    fn tick_until(&mut self, what: &str, pred: impl Fn(&ConversationStateMachine) -> bool) {
        for _ in 0..200 {
            if pred(&self.machine) {
                return;
            }
            self.machine.tick();
        }
        panic!(
            "never reached '{what}'; stuck in {}",
            self.machine.state()
        );
    }

    fn boot_to_idle(&mut self) {
        let handle = self.machine.handle();
        self.machine.tick();
        handle.push_condition(Condition::FrontendReady);
        self.tick_until("generation gate", |m| {
            m.state() == SessionState::WaitingForGenerationServiceReady
        });
        handle.push_condition(Condition::GenerationReady);
        self.tick_until("waiting-for-user-start", |m| {
            m.state() == SessionState::WaitingForUserStart
        });
        handle.push_condition(Condition::UserStartGame);
        self.tick_until("idle", |m| m.state() == SessionState::Idle);
    }

    fn start_recording(&mut self) {
        self.machine
            .handle()
            .push_condition(Condition::UserStartRecording);
        self.tick_until("recording", |m| {
            m.state() == SessionState::WaitingForRecordingStop
        });
    }

    fn stop_recording(&mut self) {
        self.machine
            .handle()
            .push_condition(Condition::UserStopRecording);
        self.tick_until("waiting-for-response", |m| {
            m.state() == SessionState::WaitingForResponse
        });
    }

    fn inject_normal_motion_response(&mut self, frames: usize) {
        self.transport.inject(&Record::Normal);
        self.transport.inject(&Record::MotionStart {
            joint_names: joint_names(),
            element_type: ElementType::F32,
            restpose: None,
            timeline_offset: None,
        });
        let width = anima_wire::motion_row_width(JOINTS.len());
        let mut rows = vec![0.0f32; width * frames];
        for f in 0..frames {
            for j in 0..JOINTS.len() {
                let base = f * width + j * 9;
                rows[base] = 1.0;
                rows[base + 4] = 1.0;
                rows[base + 8] = 1.0;
            }
        }
        let bytes: Vec<u8> = rows.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.transport.inject(&Record::MotionBody {
            data: Bytes::from(bytes),
        });
    }

    fn end_all_channels(&mut self) {
        self.transport.inject(&Record::MotionEnd);
        self.transport.inject(&Record::AudioEnd);
        self.transport.inject(&Record::FaceEnd);
    }
}

// ---- scenarios ----------------------------------------------------------

#[test]
fn startup_reaches_idle() {
    let mut h = harness();
    h.boot_to_idle();
    assert_eq!(h.machine.state(), SessionState::Idle);
    // No notices on a clean startup
    assert!(h.frontend.notices.lock().is_empty());
    // The frontend observed every transition, in order
    let states = h.frontend.states.lock();
    assert_eq!(states.first(), Some(&SessionState::WaitingForFrontendReady));
    assert!(states.contains(&SessionState::SyncingAssets));
}

#[test]
fn init_timeout_forces_exit() {
    let mut h = harness_with(SessionConfig {
        init_timeout_secs: 0.0,
        ..config()
    });
    h.machine.tick();
    assert_eq!(h.machine.state(), SessionState::Exit);
    // Terminal exit surfaces a persistent notice
    assert_eq!(h.frontend.notices.lock().len(), 1);
    // The loop is halted permanently
    h.machine.tick();
    assert_eq!(h.machine.stats().ticks, 1);
}

#[test]
fn early_user_start_is_reenqueued_not_dropped() {
    let mut h = harness();
    let handle = h.machine.handle();
    // Pushed before startup is anywhere near complete
    handle.push_condition(Condition::UserStartGame);
    h.machine.tick();
    handle.push_condition(Condition::FrontendReady);
    h.tick_until("generation gate", |m| {
        m.state() == SessionState::WaitingForGenerationServiceReady
    });
    handle.push_condition(Condition::GenerationReady);
    // The re-enqueued trigger is honored once startup completes
    h.tick_until("idle", |m| m.state() == SessionState::Idle);
    assert!(h.machine.stats().events_reenqueued > 0);
}

#[test]
fn recording_switches_local_tier_to_listen() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();

    assert_eq!(h.machine.state(), SessionState::WaitingForRecordingStop);
    let playback = h.machine.playback().unwrap();
    let buffer = playback.lock();
    // The looped listen variant is in the local tier
    assert_eq!(buffer.joint_frames(Tier::Local), 6);
    assert_eq!(buffer.active_tier(), Tier::Local);
    // The session start record went out
    assert_eq!(h.transport.sent_count(), 1);
}

#[test]
fn captured_audio_is_uploaded_and_stop_flushes() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    assert!(h.microphone.is_capturing());
    let after_start = h.transport.sent_count();

    // Two captured frames go out while recording
    h.microphone
        .queued
        .lock()
        .push_back(Bytes::from_static(&[1u8; 320]));
    h.microphone
        .queued
        .lock()
        .push_back(Bytes::from_static(&[2u8; 320]));
    h.machine.tick();
    assert_eq!(h.transport.sent_count(), after_start + 2);

    // A frame still buffered at stop is flushed, then the end marker goes
    // out and capture stops
    h.microphone
        .queued
        .lock()
        .push_back(Bytes::from_static(&[3u8; 320]));
    h.stop_recording();
    assert_eq!(h.transport.sent_count(), after_start + 4);
    assert!(!h.microphone.is_capturing());
}

#[test]
fn full_turn_streams_and_returns_to_idle() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    h.inject_normal_motion_response(4);
    h.transport.inject(&Record::AudioStart {
        frame_rate: 16_000,
        channels: 1,
        sample_width: 2,
    });
    h.transport.inject(&Record::AudioBody {
        data: Bytes::from(vec![0u8; 3200]),
    });
    h.end_all_channels();

    h.tick_until("streaming", |m| {
        m.state() == SessionState::StreamingPlayback
            || m.state() == SessionState::WaitingForPlaybackFinish
            || m.state() == SessionState::Idle
    });

    h.tick_until("idle again", |m| m.state() == SessionState::Idle);

    // The streamed tier received the decoded motion
    let playback = h.machine.playback().unwrap();
    assert_eq!(playback.lock().joint_frames(Tier::Streamed), 4);
    // Response audio reached the sink
    assert_eq!(h.audio_sink.played.lock().len(), 1);
    // Clean turn: no failure stats, affinity warmed
    assert_eq!(h.machine.stats().turns_failed, 0);
    assert_eq!(h.machine.affinity().completed_turns, 1);
    assert!(!h.transport.is_connected());
}

#[test]
fn failed_before_normal_plays_apology_and_returns_to_idle() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    h.transport.inject(&Record::Failed {
        message: "no capacity".into(),
    });

    h.tick_until("apology", |m| m.state() == SessionState::WaitingForApology);
    h.tick_until("idle after apology", |m| m.state() == SessionState::Idle);

    assert_eq!(h.machine.stats().turns_failed, 1);
    assert_eq!(h.machine.affinity().failed_turns, 1);
    // Recoverable failure: no persistent notice, session torn down
    assert!(h.frontend.notices.lock().is_empty());
    assert!(!h.transport.is_connected());
}

#[test]
fn mid_stream_failure_routes_to_shared_failure_path() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    h.inject_normal_motion_response(2);
    h.tick_until("streaming", |m| m.state() == SessionState::StreamingPlayback);

    h.transport.inject(&Record::Failed {
        message: "backend lost".into(),
    });
    h.tick_until("idle after failure", |m| m.state() == SessionState::Idle);
    assert_eq!(h.machine.stats().turns_failed, 1);
}

#[test]
fn user_interrupt_settles_and_returns_to_idle() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    h.inject_normal_motion_response(30);
    h.tick_until("streaming", |m| m.state() == SessionState::StreamingPlayback);

    h.machine.handle().push_condition(Condition::UserInterrupt);
    h.tick_until("settling", |m| {
        m.state() == SessionState::WaitingForStreamedInterruption
    });
    h.tick_until("idle after interrupt", |m| m.state() == SessionState::Idle);

    assert_eq!(h.machine.affinity().interrupted_turns, 1);
    // Buffered-but-unplayed audio was flushed
    assert!(*h.audio_sink.flushes.lock() >= 1);
}

#[test]
fn leave_classification_exits_after_farewell() {
    let mut h = harness();
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    h.transport.inject(&Record::Leave);
    h.end_all_channels();

    h.tick_until("exit", |m| m.state() == SessionState::Exit);
    // Terminal exit surfaces the persistent notice
    assert_eq!(h.frontend.notices.lock().len(), 1);
}

#[test]
fn broken_channel_pauses_without_transition_then_resumes() {
    let mut h = harness_with(SessionConfig {
        health_margin_secs: 0.25,
        ..config()
    });
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    // 12 motion frames = 0.4s at 30 fps; margin starves near the tail
    h.inject_normal_motion_response(12);
    h.tick_until("streaming", |m| m.state() == SessionState::StreamingPlayback);

    h.tick_until("paused", |m| m.stats().playback_pauses > 0);
    // A transient stall is not a session boundary
    assert_eq!(h.machine.state(), SessionState::StreamingPlayback);
    assert!(*h.frontend.indicator.lock());

    // Ending the channels restores the margin; playback resumes and
    // the indicator clears
    h.end_all_channels();
    h.tick_until("resumed", |m| m.stats().playback_resumes > 0);
    assert!(!*h.frontend.indicator.lock());

    h.tick_until("idle after stall", |m| m.state() == SessionState::Idle);
}

#[test]
fn response_timeout_is_treated_as_failure() {
    let mut h = harness_with(SessionConfig {
        response_timeout_secs: 0.0,
        ..config()
    });
    h.boot_to_idle();
    h.start_recording();
    h.stop_recording();

    // No response ever arrives; the deadline converts to the failure path
    h.tick_until("apology after timeout", |m| {
        m.state() == SessionState::WaitingForApology || m.state() == SessionState::Idle
    });
    assert_eq!(h.machine.stats().turns_failed, 1);
}

#[test]
fn config_update_applies_without_transition() {
    let mut h = harness();
    h.boot_to_idle();

    h.machine.handle().push(
        anima_session::ConditionedMessage::with_payload(
            Condition::ConfigUpdated,
            serde_json::json!({ "language": "fr" }),
        ),
    );
    h.machine.tick();

    assert_eq!(h.machine.state(), SessionState::Idle);
    assert_eq!(h.machine.config().language, "fr");
    assert_eq!(h.machine.stats().config_updates, 1);
}

#[test]
fn unexpected_events_warn_but_never_crash() {
    let mut h = harness();
    h.boot_to_idle();

    let handle = h.machine.handle();
    handle.push_condition(Condition::UserStopRecording);
    handle.push_condition(Condition::ChannelRecovered);
    // Late playback completions are silently dropped
    handle.push_condition(Condition::LocalPlaybackFinished);
    for _ in 0..4 {
        h.machine.tick();
    }

    assert_eq!(h.machine.state(), SessionState::Idle);
    assert_eq!(h.machine.stats().events_ignored, 2);
}
