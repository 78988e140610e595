//! External collaborator interfaces
//!
//! Mesh loading, asset CRUD, capture mechanics, and UI rendering live
//! outside the engine; the machine talks to them through these traits.
//! All are constructor-injected and non-null; a genuinely absent
//! dependency (no character spawned yet) is an `Option` on the machine.

use bytes::Bytes;

use anima_clip::{AudioClip, FaceClip, MotionClip};
use anima_core::{AnimaResult, CharacterId};

use crate::SessionState;

/// A pre-baked local clip with its loop metadata
#[derive(Debug, Clone)]
pub struct LocalClip {
    pub motion: MotionClip,
    pub face: Option<FaceClip>,
    pub loop_range: Option<(usize, usize)>,
}

/// Catalog of pre-baked clips keyed by semantic label
/// ("idle", "listen", "leave", "error", ...)
pub trait AssetCatalog: Send {
    /// All registered variants under a label; empty if none
    fn variants(&self, label: &str) -> Vec<LocalClip>;

    /// Refresh the catalog from backing storage
    fn sync(&mut self) -> AnimaResult<()>;
}

/// Capture source emitting fixed-size PCM frames while recording
pub trait Microphone: Send {
    fn start(&mut self) -> AnimaResult<()>;
    fn stop(&mut self);

    /// Frames captured since the last drain; empty when not recording
    fn drain(&mut self) -> Vec<Bytes>;

    fn is_capturing(&self) -> bool;
}

/// Playback sink for decoded response audio
pub trait AudioSink: Send {
    fn enqueue(&mut self, clip: &AudioClip);

    /// Drop any queued-but-unplayed audio
    fn flush(&mut self);
}

/// The safe action offered on a persistent notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    Restart,
}

/// A persistent, non-auto-dismissing user notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub action: NoticeAction,
}

/// Surface the machine exposes toward the UI layer
pub trait FrontendBridge: Send {
    /// Show a persistent notice offering one safe action
    fn show_notice(&mut self, notice: Notice);

    /// Toggle the mid-playback recovery indicator
    fn set_recovery_indicator(&mut self, visible: bool);

    /// Observe every state transition
    fn state_changed(&mut self, state: SessionState);
}

/// Joints and blendshapes the spawned mesh exposes
#[derive(Debug, Clone)]
pub struct CharacterHandle {
    pub id: CharacterId,
    pub joint_names: Vec<String>,
    pub blendshape_names: Vec<String>,
}

/// Scene and mesh lifecycle
pub trait SceneController: Send {
    fn spawn_environment(&mut self) -> AnimaResult<()>;

    fn spawn_character(&mut self, id: CharacterId) -> AnimaResult<CharacterHandle>;
}
