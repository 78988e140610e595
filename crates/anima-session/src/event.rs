//! Conditioned messages - the state machine's only input unit

use anima_stream::ChannelKind;

/// Event condition. UI-pushable kinds are listed first; the rest are
/// enqueued internally by the machine or by collaborator callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    // Pushed by the UI
    FrontendReady,
    FrontendNotReady,
    UserStartRecording,
    UserStopRecording,
    UserInterrupt,
    UserStartGame,
    ConfigUpdated,

    // Startup completions
    EnvironmentSpawned,
    CharacterSpawned,
    AssetsSynced,
    GenerationReady,
    GenerationNotReady,

    // Playback completions; expected but often irrelevant by the time
    // they arrive, so unexpected occurrences are dropped silently
    LocalPlaybackFinished,
    StreamedPlaybackFinished,

    // Degradation signals
    ChannelBroken(ChannelKind),
    ChannelRecovered,
}

impl Condition {
    /// The two completion events whose late arrival in the wrong state is
    /// expected and silently dropped instead of logged.
    pub fn droppable_when_unexpected(self) -> bool {
        matches!(
            self,
            Condition::LocalPlaybackFinished | Condition::StreamedPlaybackFinished
        )
    }
}

/// A tagged event: condition plus optional payload
#[derive(Debug, Clone)]
pub struct ConditionedMessage {
    pub condition: Condition,
    pub payload: Option<serde_json::Value>,
}

impl ConditionedMessage {
    pub fn new(condition: Condition) -> Self {
        ConditionedMessage {
            condition,
            payload: None,
        }
    }

    pub fn with_payload(condition: Condition, payload: serde_json::Value) -> Self {
        ConditionedMessage {
            condition,
            payload: Some(payload),
        }
    }
}
