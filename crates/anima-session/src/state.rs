//! Session states

use std::fmt;

/// The fixed set of conversation states.
///
/// Transitions are always explicit: a handler moves to exactly one next
/// state or stays put. `Exit` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Init,
    WaitingForFrontendReady,
    SpawnEnvironment,
    SpawnCharacter,
    WaitingForGenerationServiceReady,
    GenerationNotReady,
    SyncingAssets,
    Idle,
    WaitingForRecordingStop,
    GenerationFailed,
    WaitingForApology,
    WaitingForResponse,
    WaitingForLeaveGeneration,
    StreamingPlayback,
    WaitingForPlaybackFinish,
    WaitingForLeavePlayback,
    WaitingForStreamedInterruption,
    WaitingForLocalInterruption,
    WaitingForUserStart,
    Exit,
}

impl SessionState {
    /// States that must complete before a "user started" trigger is
    /// honored; the trigger is re-enqueued while one of these holds.
    pub fn in_startup(self) -> bool {
        matches!(
            self,
            SessionState::Init
                | SessionState::WaitingForFrontendReady
                | SessionState::SpawnEnvironment
                | SessionState::SpawnCharacter
                | SessionState::WaitingForGenerationServiceReady
                | SessionState::GenerationNotReady
                | SessionState::SyncingAssets
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Exit
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::WaitingForFrontendReady => "waiting-for-frontend-ready",
            SessionState::SpawnEnvironment => "spawn-environment",
            SessionState::SpawnCharacter => "spawn-character",
            SessionState::WaitingForGenerationServiceReady => {
                "waiting-for-generation-service-ready"
            }
            SessionState::GenerationNotReady => "generation-not-ready",
            SessionState::SyncingAssets => "syncing-assets",
            SessionState::Idle => "idle",
            SessionState::WaitingForRecordingStop => "waiting-for-recording-stop",
            SessionState::GenerationFailed => "generation-failed",
            SessionState::WaitingForApology => "waiting-for-apology",
            SessionState::WaitingForResponse => "waiting-for-response",
            SessionState::WaitingForLeaveGeneration => "waiting-for-leave-generation",
            SessionState::StreamingPlayback => "streaming-playback",
            SessionState::WaitingForPlaybackFinish => "waiting-for-playback-finish",
            SessionState::WaitingForLeavePlayback => "waiting-for-leave-playback",
            SessionState::WaitingForStreamedInterruption => "waiting-for-streamed-interruption",
            SessionState::WaitingForLocalInterruption => "waiting-for-local-interruption",
            SessionState::WaitingForUserStart => "waiting-for-user-start",
            SessionState::Exit => "exit",
        };
        write!(f, "{name}")
    }
}
