//! The conversation state machine
//!
//! Single-threaded and cooperative: one tick every ~33 ms, at most one
//! pending event dispatched per tick, handlers run to completion. The
//! render loop reads the playback buffer independently and never enters
//! this loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use anima_clip::AudioClip;
use anima_core::{
    AnimaError, AnimaResult, CharacterId, ProgressTracker, SessionClock, SessionTime, TurnId,
};
use anima_playback::{AnimationPlaybackBuffer, GazeConfig, PlaybackConfig, Tier};
use anima_stream::{
    ChannelEstimators, ChannelKind, ResponseKind, StartDescriptor, StreamConfig,
    StreamingSessionClient,
};
use anima_transport::Transport;
use anima_wire::SessionKind;

use crate::{
    Affinity, AssetCatalog, AudioSink, CharacterHandle, Condition, ConditionedMessage,
    FrontendBridge, Microphone, Notice, NoticeAction, SceneController, SessionConfig,
    SessionState, SessionStats,
};

/// Creates one connected transport per streamed session
pub type TransportFactory = Box<dyn FnMut() -> AnimaResult<Arc<dyn Transport>> + Send>;

/// Constructor-injected collaborators. All are non-null; dependencies that
/// are genuinely absent for part of the lifecycle (no character spawned
/// yet) live as `Option` fields on the machine instead.
pub struct SessionDeps {
    pub transport_factory: TransportFactory,
    pub catalog: Box<dyn AssetCatalog>,
    pub microphone: Box<dyn Microphone>,
    pub audio_sink: Box<dyn AudioSink>,
    pub frontend: Box<dyn FrontendBridge>,
    pub scene: Box<dyn SceneController>,
    pub progress: ProgressTracker,
}

/// State shared with the UI and render sides
struct SharedView {
    state: SessionState,
    blend: f32,
    cursor: usize,
}

/// Cloneable handle for pushing events and reading loop state
#[derive(Clone)]
pub struct SessionHandle {
    queue: Arc<Mutex<VecDeque<ConditionedMessage>>>,
    view: Arc<Mutex<SharedView>>,
}

impl SessionHandle {
    /// Enqueue an event; it is dispatched on a subsequent tick
    pub fn push(&self, msg: ConditionedMessage) {
        self.queue.lock().push_back(msg);
    }

    pub fn push_condition(&self, condition: Condition) {
        self.push(ConditionedMessage::new(condition));
    }

    pub fn state(&self) -> SessionState {
        self.view.lock().state
    }

    /// Current idle/active blend weight for pose resolution
    pub fn blend_weight(&self) -> f32 {
        self.view.lock().blend
    }

    /// Current active-tier playback cursor
    pub fn render_cursor(&self) -> usize {
        self.view.lock().cursor
    }
}

enum TurnOutcome {
    Completed,
    Interrupted,
}

/// Top-level orchestrator for one avatar conversation
pub struct ConversationStateMachine {
    cfg: SessionConfig,
    clock: SessionClock,
    deps: SessionDeps,

    state: SessionState,
    queue: Arc<Mutex<VecDeque<ConditionedMessage>>>,
    view: Arc<Mutex<SharedView>>,

    booted: bool,
    init_deadline: SessionTime,
    state_deadline: Option<SessionTime>,

    /// Present once a character has spawned
    buffer: Option<Arc<Mutex<AnimationPlaybackBuffer>>>,
    character: Option<CharacterHandle>,

    /// Present while a streamed session is open
    client: Option<StreamingSessionClient>,
    transport: Option<Arc<dyn Transport>>,

    estimators: ChannelEstimators,
    stats: SessionStats,
    affinity: Affinity,
    turn: TurnId,

    cursor: usize,
    paused: bool,
    streamed_done: bool,
    local_done_sent: bool,
    underruns: [u32; 3],
    pending_audio: VecDeque<AudioClip>,
    audio_delay_ticks: u32,

    blend: f32,
    blend_target: f32,
}

impl ConversationStateMachine {
    pub fn new(cfg: SessionConfig, deps: SessionDeps) -> Self {
        let clock = SessionClock::start();
        let init_deadline = clock.deadline_in(Duration::from_secs_f64(cfg.init_timeout_secs));
        let estimators = ChannelEstimators::new(
            cfg.min_audio_secs,
            cfg.min_motion_frames as f64,
            cfg.min_face_frames as f64,
        );
        ConversationStateMachine {
            clock,
            deps,
            state: SessionState::Init,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            view: Arc::new(Mutex::new(SharedView {
                state: SessionState::Init,
                blend: 0.0,
                cursor: 0,
            })),
            booted: false,
            init_deadline,
            state_deadline: None,
            buffer: None,
            character: None,
            client: None,
            transport: None,
            estimators,
            stats: SessionStats::default(),
            affinity: Affinity::new(),
            turn: TurnId::new(0),
            cursor: 0,
            paused: false,
            streamed_done: false,
            local_done_sent: false,
            underruns: [0; 3],
            pending_audio: VecDeque::new(),
            audio_delay_ticks: 0,
            blend: 0.0,
            blend_target: 0.0,
            cfg,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            queue: Arc::clone(&self.queue),
            view: Arc::clone(&self.view),
        }
    }

    /// The per-character blending buffer; render calls `resolve_pose` on
    /// it directly. Absent until the character has spawned.
    pub fn playback(&self) -> Option<Arc<Mutex<AnimationPlaybackBuffer>>> {
        self.buffer.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The spawned character's rig, once available
    pub fn character(&self) -> Option<&CharacterHandle> {
        self.character.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    /// Drive the loop until the terminal state
    pub async fn run(&mut self) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.cfg.tick_interval_ms));
        while !self.state.is_terminal() {
            interval.tick().await;
            self.tick();
        }
    }

    /// One cooperative step: timeouts, state duties, then at most one
    /// dispatched event.
    pub fn tick(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.stats.ticks += 1;

        if self.state == SessionState::Init && self.clock.expired(self.init_deadline) {
            tracing::warn!("initialization exceeded its hard timeout");
            self.enter_exit("initialization timed out");
            return;
        }
        self.check_state_deadline();
        if self.state.is_terminal() {
            return;
        }

        self.run_duties();

        let msg = self.queue.lock().pop_front();
        if let Some(msg) = msg {
            self.dispatch(msg);
        }
    }

    // ---- per-tick duties -------------------------------------------------

    fn run_duties(&mut self) {
        self.ramp_blend();
        match self.state {
            SessionState::Init => {
                if !self.booted {
                    self.boot();
                }
            }
            SessionState::WaitingForRecordingStop => self.pump_microphone(),
            SessionState::WaitingForLocalInterruption | SessionState::WaitingForApology => {
                self.advance_local()
            }
            SessionState::WaitingForResponse => self.poll_classification(),
            SessionState::WaitingForLeaveGeneration => self.poll_leave_generation(),
            SessionState::StreamingPlayback => self.pump_streaming(),
            SessionState::WaitingForLeavePlayback => self.pump_leave_playback(),
            SessionState::WaitingForPlaybackFinish
            | SessionState::WaitingForStreamedInterruption => self.settle_blend_out(),
            SessionState::GenerationFailed => self.begin_apology(),
            _ => {}
        }
    }

    fn boot(&mut self) {
        self.deps.progress.reset();
        self.deps.progress.update(0.1, "engine initialized", "session");
        self.booted = true;
        self.transition(SessionState::WaitingForFrontendReady);
    }

    fn pump_microphone(&mut self) {
        let frames = self.deps.microphone.drain();
        if frames.is_empty() {
            return;
        }
        let result = (|| -> AnimaResult<()> {
            if let Some(client) = &self.client {
                for frame in frames {
                    client.send_user_audio(frame)?;
                }
            }
            Ok(())
        })();
        if let Err(e) = result {
            let msg = e.to_string();
            self.fail_turn(&msg);
        }
    }

    fn advance_local(&mut self) {
        self.cursor += 1;
        self.sync_view();
        let finished = self
            .with_buffer(|b| b.tier_finished(Tier::Local, self.cursor))
            .unwrap_or(true);
        if finished && !self.local_done_sent {
            self.local_done_sent = true;
            self.push_internal(Condition::LocalPlaybackFinished);
        }
    }

    fn poll_classification(&mut self) {
        let Some(client) = &self.client else {
            self.fail_turn("no open session while waiting for a response");
            return;
        };
        match client.response_type() {
            ResponseKind::Pending => {}
            ResponseKind::Normal => {
                if client.stream_ready() {
                    self.begin_streamed_playback();
                }
            }
            ResponseKind::Leave => {
                let timeout = self.cfg.response_timeout_secs;
                self.transition(SessionState::WaitingForLeaveGeneration);
                self.arm_deadline(timeout);
            }
            ResponseKind::Failed => {
                let msg = client
                    .failure_message()
                    .unwrap_or_else(|| "generation failed".to_string());
                self.fail_turn(&msg);
            }
        }
    }

    fn begin_streamed_playback(&mut self) {
        let Some(client) = &self.client else { return };
        let shifts = client.timeline_offsets().shifts();
        self.audio_delay_ticks = shifts.audio.max(0) as u32;
        self.with_buffer(|b| {
            b.begin_streamed_turn(shifts.motion.max(0) as usize, shifts.face.max(0) as usize);
            b.set_active_tier(Tier::Streamed);
        });
        self.cursor = 0;
        self.sync_view();
        self.paused = false;
        self.streamed_done = false;
        self.underruns = [0; 3];
        self.blend_target = 1.0;
        self.transition(SessionState::StreamingPlayback);
    }

    fn pump_streaming(&mut self) {
        if !self.drain_client_into_buffer() {
            return;
        }
        self.flush_audio();

        let Some(client) = &self.client else { return };
        let snapshot = client.health_snapshot();
        let session_ended = client.session_ended();

        let played_secs = self.cursor as f64 / self.cfg.motion_fps;
        let margin = self.cfg.health_margin_secs;
        if self.paused {
            if snapshot.regained(played_secs, margin) {
                self.resume_playback();
            }
        } else if let Some(kind) = snapshot.starving(played_secs, margin) {
            self.pause_playback(kind);
        }

        if !self.paused {
            self.cursor += 1;
            self.sync_view();
        }

        let streamed_finished = self
            .with_buffer(|b| b.tier_finished(Tier::Streamed, self.cursor))
            .unwrap_or(true);
        if (self.streamed_done || session_ended) && streamed_finished {
            self.blend_target = 0.0;
            self.transition(SessionState::WaitingForPlaybackFinish);
        }
    }

    fn poll_leave_generation(&mut self) {
        if !self.drain_client_into_buffer() {
            return;
        }
        let (ready, ended) = match &self.client {
            None => (true, true),
            Some(c) => (c.stream_ready(), c.session_ended()),
        };
        if !(ready || ended) {
            return;
        }

        let has_streamed = self
            .with_buffer(|b| b.joint_frames(Tier::Streamed) > 0)
            .unwrap_or(false);
        if has_streamed {
            self.with_buffer(|b| b.set_active_tier(Tier::Streamed));
            self.streamed_done = ended;
            self.cursor = 0;
            self.sync_view();
            self.blend_target = 1.0;
        } else {
            self.play_local_farewell();
        }
        self.transition(SessionState::WaitingForLeavePlayback);
    }

    fn pump_leave_playback(&mut self) {
        if !self.drain_client_into_buffer() {
            return;
        }
        self.flush_audio();
        self.cursor += 1;
        self.sync_view();

        let active = self.with_buffer(|b| b.active_tier()).unwrap_or(Tier::Local);
        let finished = self
            .with_buffer(|b| b.tier_finished(active, self.cursor))
            .unwrap_or(true);
        let stream_drained = active != Tier::Streamed
            || self.streamed_done
            || self.client.as_ref().map_or(true, |c| c.session_ended());
        if finished && stream_drained {
            self.enter_exit("session ended by the service");
        }
    }

    fn settle_blend_out(&mut self) {
        if self.blend > 0.0 {
            return;
        }
        match self.state {
            SessionState::WaitingForPlaybackFinish => self.finalize_turn(TurnOutcome::Completed),
            SessionState::WaitingForStreamedInterruption => {
                self.finalize_turn(TurnOutcome::Interrupted)
            }
            _ => {}
        }
    }

    fn begin_apology(&mut self) {
        self.teardown_session();
        self.switch_local("error");
        self.with_buffer(|b| b.set_active_tier(Tier::Local));
        self.blend_target = 1.0;
        self.transition(SessionState::WaitingForApology);
    }

    // ---- event dispatch --------------------------------------------------

    fn dispatch(&mut self, msg: ConditionedMessage) {
        self.stats.events_dispatched += 1;

        // Cross-state handling first
        match msg.condition {
            Condition::ConfigUpdated => {
                match &msg.payload {
                    Some(payload) => {
                        self.cfg.apply_update(payload);
                        self.stats.config_updates += 1;
                    }
                    None => tracing::warn!("config update without payload ignored"),
                }
                return;
            }
            // Startup must fully complete before "user started" is
            // honored; early arrivals are re-enqueued, never dropped.
            Condition::UserStartGame if self.state.in_startup() => {
                self.stats.events_reenqueued += 1;
                self.queue.lock().push_back(msg);
                return;
            }
            _ => {}
        }

        match (self.state, msg.condition) {
            (SessionState::WaitingForFrontendReady, Condition::FrontendReady) => {
                self.do_spawn_environment();
            }
            (SessionState::WaitingForFrontendReady, Condition::FrontendNotReady) => {}

            (SessionState::SpawnEnvironment, Condition::EnvironmentSpawned) => {
                self.do_spawn_character();
            }
            (SessionState::SpawnCharacter, Condition::CharacterSpawned) => {
                let timeout = self.cfg.generation_ready_timeout_secs;
                self.transition(SessionState::WaitingForGenerationServiceReady);
                self.arm_deadline(timeout);
            }
            (SessionState::WaitingForGenerationServiceReady, Condition::GenerationReady) => {
                self.do_sync_assets();
            }
            (SessionState::WaitingForGenerationServiceReady, Condition::GenerationNotReady) => {
                self.generation_unavailable();
            }
            (SessionState::GenerationNotReady, Condition::GenerationReady) => {
                self.do_sync_assets();
            }
            (SessionState::SyncingAssets, Condition::AssetsSynced) => {
                self.deps.progress.update(1.0, "assets ready", "session");
                self.transition(SessionState::WaitingForUserStart);
            }
            (SessionState::WaitingForUserStart, Condition::UserStartGame) => {
                self.transition(SessionState::Idle);
            }

            (SessionState::Idle, Condition::UserStartRecording) => self.begin_turn(),

            (SessionState::WaitingForRecordingStop, Condition::UserStopRecording) => {
                self.end_recording();
            }
            (SessionState::WaitingForRecordingStop, Condition::UserInterrupt)
            | (SessionState::WaitingForLocalInterruption, Condition::UserInterrupt)
            | (SessionState::WaitingForResponse, Condition::UserInterrupt)
            | (SessionState::StreamingPlayback, Condition::UserInterrupt) => self.abort_turn(),

            (SessionState::WaitingForLocalInterruption, Condition::LocalPlaybackFinished) => {
                let timeout = self.cfg.response_timeout_secs;
                self.transition(SessionState::WaitingForResponse);
                self.arm_deadline(timeout);
            }

            (SessionState::StreamingPlayback, Condition::ChannelBroken(kind)) => {
                self.pause_playback(kind);
            }
            (SessionState::StreamingPlayback, Condition::ChannelRecovered) => {
                self.try_resume_playback();
            }

            (SessionState::WaitingForApology, Condition::LocalPlaybackFinished) => {
                self.finish_apology();
            }

            (_, condition) if condition.droppable_when_unexpected() => {
                // Late playback completions are expected noise
            }
            (state, condition) => {
                self.stats.events_ignored += 1;
                tracing::warn!("ignoring unexpected event {condition:?} in state {state}");
            }
        }
    }

    // ---- startup ---------------------------------------------------------

    fn do_spawn_environment(&mut self) {
        self.transition(SessionState::SpawnEnvironment);
        self.deps.progress.update(0.3, "spawning environment", "session");
        match self.deps.scene.spawn_environment() {
            Ok(()) => self.push_internal(Condition::EnvironmentSpawned),
            Err(e) => {
                let msg = e.to_string();
                self.startup_failure(&msg);
            }
        }
    }

    fn do_spawn_character(&mut self) {
        self.transition(SessionState::SpawnCharacter);
        self.deps.progress.update(0.6, "spawning character", "session");
        match self
            .deps
            .scene
            .spawn_character(CharacterId::new(self.cfg.character_id))
        {
            Ok(handle) => {
                let playback_cfg = PlaybackConfig {
                    gaze: GazeConfig {
                        epsilon_rad: self.cfg.gaze_epsilon_rad,
                        run_frames: self.cfg.gaze_run_frames,
                    },
                    eye_joints: self.cfg.eye_joints.clone(),
                };
                self.buffer = Some(Arc::new(Mutex::new(AnimationPlaybackBuffer::new(
                    handle.joint_names.clone(),
                    handle.blendshape_names.clone(),
                    playback_cfg,
                ))));
                self.character = Some(handle);
                self.push_internal(Condition::CharacterSpawned);
            }
            Err(e) => {
                let msg = e.to_string();
                self.startup_failure(&msg);
            }
        }
    }

    fn do_sync_assets(&mut self) {
        self.transition(SessionState::SyncingAssets);
        self.deps.progress.update(0.8, "syncing assets", "session");
        match self.deps.catalog.sync() {
            Ok(()) => {
                self.load_catalog_variants();
                self.push_internal(Condition::AssetsSynced);
            }
            Err(e) => {
                let msg = e.to_string();
                self.startup_failure(&msg);
            }
        }
    }

    fn load_catalog_variants(&mut self) {
        let Some(buffer) = &self.buffer else { return };
        let mut buffer = buffer.lock();
        for label in ["idle", "listen", "interrupted", "leave", "error"] {
            for clip in self.deps.catalog.variants(label) {
                if let Err(e) = buffer.register_motion_variant(label, clip.motion, clip.loop_range)
                {
                    tracing::warn!("skipping motion variant under '{label}': {e}");
                }
                if let Some(face) = clip.face {
                    if let Err(e) = buffer.register_face_variant(label, face) {
                        tracing::warn!("skipping face variant under '{label}': {e}");
                    }
                }
            }
        }
        if let Err(e) = buffer.switch_joint_animation("idle", Tier::Idle) {
            tracing::warn!("no idle baseline registered: {e}");
        }
        buffer.switch_morph_animation("idle", Tier::Idle);
    }

    fn generation_unavailable(&mut self) {
        self.transition(SessionState::GenerationNotReady);
        self.deps.frontend.show_notice(Notice {
            text: "The character service is not available right now. Restart to try again."
                .to_string(),
            action: NoticeAction::Restart,
        });
    }

    fn startup_failure(&mut self, message: &str) {
        tracing::warn!("startup failed: {message}");
        self.deps.frontend.show_notice(Notice {
            text: format!("Startup failed: {message}. Restart to try again."),
            action: NoticeAction::Restart,
        });
        self.enter_exit(message);
    }

    // ---- turn lifecycle --------------------------------------------------

    fn begin_turn(&mut self) {
        self.stats.turns_started += 1;
        self.turn = self.turn.next();

        if let Err(e) = self.deps.microphone.start() {
            let msg = e.to_string();
            self.fail_turn(&msg);
            return;
        }

        self.switch_local("listen");
        self.with_buffer(|b| b.set_active_tier(Tier::Local));
        self.blend_target = 1.0;

        let opened = (|| -> AnimaResult<()> {
            let transport = (self.deps.transport_factory)()?;
            let stream_cfg = StreamConfig {
                min_audio_secs: self.estimators.audio.recommendation(),
                min_motion_frames: self.estimators.motion.recommendation() as u32,
                min_face_frames: self.estimators.face.recommendation() as u32,
                motion_fps: self.cfg.motion_fps,
                face_fps: self.cfg.face_fps,
            };
            let client = StreamingSessionClient::connect(
                Arc::clone(&transport),
                self.clock.clone(),
                stream_cfg,
            );
            client.start(&StartDescriptor {
                kind: SessionKind::Conversation,
                character_id: CharacterId::new(self.cfg.character_id),
                turn_id: self.turn,
                language: self.cfg.language.clone(),
                audio: self.cfg.audio,
                lead_in_secs: self.cfg.lead_in_secs,
                lead_out_secs: self.cfg.lead_out_secs,
                text: None,
            })?;
            self.transport = Some(transport);
            self.client = Some(client);
            Ok(())
        })();

        match opened {
            Ok(()) => self.transition(SessionState::WaitingForRecordingStop),
            Err(e) => {
                let msg = e.to_string();
                self.fail_turn(&msg);
            }
        }
    }

    fn end_recording(&mut self) {
        self.deps.microphone.stop();

        // Flush any unsent audio, then signal stop to the streaming layer
        let frames = self.deps.microphone.drain();
        let flushed = (|| -> AnimaResult<()> {
            if let Some(client) = &self.client {
                for frame in frames {
                    client.send_user_audio(frame)?;
                }
                client.finish_user_audio()?;
            }
            Ok(())
        })();
        if let Err(e) = flushed {
            let msg = e.to_string();
            self.fail_turn(&msg);
            return;
        }

        // A brief local settle animation avoids a visible pose glitch at
        // the hand-off into response playback
        self.switch_local("interrupted");
        self.transition(SessionState::WaitingForLocalInterruption);
    }

    fn abort_turn(&mut self) {
        self.affinity.record_interrupt();
        self.deps.microphone.stop();
        if let Some(client) = &self.client {
            client.interrupt();
        }
        self.deps.audio_sink.flush();
        self.pending_audio.clear();
        self.blend_target = 0.0;
        self.transition(SessionState::WaitingForStreamedInterruption);
    }

    fn fail_turn(&mut self, message: &str) {
        tracing::warn!("turn failed: {message}");
        self.stats.turns_failed += 1;
        self.affinity.record_failure();
        self.deps.microphone.stop();
        self.deps.audio_sink.flush();
        self.pending_audio.clear();
        self.paused = false;
        self.deps.frontend.set_recovery_indicator(false);
        self.transition(SessionState::GenerationFailed);
    }

    fn finish_apology(&mut self) {
        self.with_buffer(|b| {
            b.clear_joint_animation(Tier::Local);
            b.clear_morph_animation(Tier::Local);
        });
        self.blend_target = 0.0;
        self.transition(SessionState::Idle);
    }

    fn finalize_turn(&mut self, outcome: TurnOutcome) {
        if let Some(client) = &self.client {
            let snapshot = client.health_snapshot();
            let played_secs = self.cursor as f64 / self.cfg.motion_fps;
            let played_frames = self.cursor as f64;
            self.estimators.audio.record_session(
                self.underruns[0],
                (snapshot.audio.received_secs - played_secs).max(0.0),
            );
            self.estimators.motion.record_session(
                self.underruns[1],
                (snapshot.motion.received_frames as f64 - played_frames).max(0.0),
            );
            self.estimators.face.record_session(
                self.underruns[2],
                (snapshot.face.received_frames as f64 - played_frames).max(0.0),
            );
        }
        self.teardown_session();
        self.deps.frontend.set_recovery_indicator(false);
        self.paused = false;
        if matches!(outcome, TurnOutcome::Completed) {
            self.affinity.record_turn();
        }
        self.with_buffer(|b| {
            b.set_active_tier(Tier::Local);
            b.clear_joint_animation(Tier::Local);
            b.clear_morph_animation(Tier::Local);
        });
        self.transition(SessionState::Idle);
    }

    /// Interrupt precedes transport disposal so no orphaned sink callback
    /// fires into a dead session.
    fn teardown_session(&mut self) {
        if let Some(client) = self.client.take() {
            client.interrupt();
        }
        if let Some(transport) = self.transport.take() {
            transport.disconnect();
        }
        self.streamed_done = false;
        self.pending_audio.clear();
        self.audio_delay_ticks = 0;
    }

    fn play_local_farewell(&mut self) {
        self.switch_local("leave");
        self.with_buffer(|b| b.set_active_tier(Tier::Local));
        self.blend_target = 1.0;
    }

    fn enter_exit(&mut self, reason: &str) {
        self.deps.microphone.stop();
        self.teardown_session();
        self.deps.frontend.show_notice(Notice {
            text: format!("The session has ended: {reason}. Restart to continue."),
            action: NoticeAction::Restart,
        });
        self.transition(SessionState::Exit);
    }

    // ---- degradation -----------------------------------------------------

    fn pause_playback(&mut self, kind: ChannelKind) {
        if self.paused {
            return;
        }
        tracing::warn!("channel {kind} ran low; holding last resolved frame");
        self.paused = true;
        self.stats.playback_pauses += 1;
        let idx = match kind {
            ChannelKind::Audio => 0,
            ChannelKind::Motion => 1,
            ChannelKind::Face => 2,
        };
        self.underruns[idx] += 1;
        self.deps.frontend.set_recovery_indicator(true);
    }

    fn try_resume_playback(&mut self) {
        if !self.paused {
            return;
        }
        let regained = match &self.client {
            None => true,
            Some(client) => {
                let played_secs = self.cursor as f64 / self.cfg.motion_fps;
                client
                    .health_snapshot()
                    .regained(played_secs, self.cfg.health_margin_secs)
            }
        };
        if regained {
            self.resume_playback();
        }
    }

    fn resume_playback(&mut self) {
        tracing::info!("all channels regained their safety margin; resuming");
        self.paused = false;
        self.stats.playback_resumes += 1;
        self.deps.frontend.set_recovery_indicator(false);
    }

    // ---- helpers ---------------------------------------------------------

    /// Drain freshly decoded chunks into the playback buffer and the audio
    /// queue. Returns false when the turn has been routed to the failure
    /// path.
    fn drain_client_into_buffer(&mut self) -> bool {
        let drained = match &self.client {
            None => return true,
            Some(client) => client.get_animation(),
        };
        match drained {
            Ok(turn) => {
                if let Some(motion) = &turn.motion {
                    self.with_buffer(|b| {
                        if let Err(e) = b.append_streamed_motion(motion) {
                            tracing::warn!("dropping mismatched motion chunk: {e}");
                        }
                    });
                }
                if let Some(face) = &turn.face {
                    self.with_buffer(|b| {
                        if let Err(e) = b.append_streamed_face(face) {
                            tracing::warn!("dropping mismatched face chunk: {e}");
                        }
                    });
                }
                if let Some(audio) = turn.audio {
                    self.pending_audio.push_back(audio);
                }
                true
            }
            Err(AnimaError::StreamEnded) => {
                self.streamed_done = true;
                true
            }
            Err(e) => {
                let msg = e.to_string();
                self.fail_turn(&msg);
                false
            }
        }
    }

    /// Release pending response audio once the presentation-time shift for
    /// the audio channel has elapsed.
    fn flush_audio(&mut self) {
        if self.audio_delay_ticks > 0 {
            self.audio_delay_ticks -= 1;
            return;
        }
        while let Some(clip) = self.pending_audio.pop_front() {
            self.deps.audio_sink.enqueue(&clip);
        }
    }

    fn switch_local(&mut self, label: &str) {
        let switched = self
            .with_buffer(|b| {
                let result = b.switch_joint_animation(label, Tier::Local);
                b.switch_morph_animation(label, Tier::Local);
                result.is_ok()
            })
            .unwrap_or(false);
        if !switched {
            // Leave nothing behind: a stale looping clip would never finish
            tracing::warn!("no local clip registered under '{label}', clearing local tier");
            self.with_buffer(|b| {
                b.clear_joint_animation(Tier::Local);
                b.clear_morph_animation(Tier::Local);
            });
        }
        self.cursor = 0;
        self.local_done_sent = false;
        self.sync_view();
    }

    fn ramp_blend(&mut self) {
        let step = self.cfg.blend_step;
        let delta = (self.blend_target - self.blend).clamp(-step, step);
        self.blend = (self.blend + delta).clamp(0.0, 1.0);
        self.view.lock().blend = self.blend;
    }

    fn with_buffer<R>(&self, f: impl FnOnce(&mut AnimationPlaybackBuffer) -> R) -> Option<R> {
        self.buffer.as_ref().map(|b| f(&mut b.lock()))
    }

    fn sync_view(&self) {
        self.view.lock().cursor = self.cursor;
    }

    fn push_internal(&self, condition: Condition) {
        self.queue.lock().push_back(ConditionedMessage::new(condition));
    }

    fn arm_deadline(&mut self, secs: f64) {
        self.state_deadline = Some(self.clock.deadline_in(Duration::from_secs_f64(secs)));
    }

    fn check_state_deadline(&mut self) {
        let Some(deadline) = self.state_deadline else {
            return;
        };
        if !self.clock.expired(deadline) {
            return;
        }
        self.state_deadline = None;
        match self.state {
            SessionState::WaitingForGenerationServiceReady => {
                tracing::warn!("generation service readiness timed out");
                self.generation_unavailable();
            }
            // Timeouts are treated identically to failures
            SessionState::WaitingForResponse => {
                self.fail_turn("timed out waiting for a response");
            }
            SessionState::WaitingForLeaveGeneration => {
                self.play_local_farewell();
                self.transition(SessionState::WaitingForLeavePlayback);
            }
            _ => {}
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }
        tracing::info!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.state_deadline = None;
        self.stats.transitions += 1;
        self.view.lock().state = next;
        self.deps.frontend.state_changed(next);
    }
}
