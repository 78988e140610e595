//! Session configuration
//!
//! Values load from a key/value store at startup and can be patched live
//! through the config-updated event.

use serde::{Deserialize, Serialize};

use anima_clip::AudioFormat;

/// Read side of the external key/value configuration store
pub trait ConfigStore: Send {
    fn get(&self, key: &str) -> Option<String>;
}

/// Everything the machine needs tuned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cooperative loop period, ~30 Hz
    pub tick_interval_ms: u64,
    /// Hard wall-clock ceiling on the init state
    pub init_timeout_secs: f64,
    /// Ceiling on waiting for generation-service readiness
    pub generation_ready_timeout_secs: f64,
    /// Ceiling on waiting for a response classification
    pub response_timeout_secs: f64,

    pub character_id: u64,
    pub language: String,
    pub audio: AudioFormat,
    /// Requested lead-in/lead-out extension, seconds
    pub lead_in_secs: f64,
    pub lead_out_secs: f64,

    /// Readiness floors (estimators adapt upward from these)
    pub min_audio_secs: f64,
    pub min_motion_frames: u32,
    pub min_face_frames: u32,
    /// Nominal stream frame rates
    pub motion_fps: f64,
    pub face_fps: f64,
    /// Lead a channel must keep over the cursor mid-playback
    pub health_margin_secs: f64,

    /// Blend weight change per tick while ramping between tiers
    pub blend_step: f32,
    /// Eye stillness threshold for the gaze override, radians
    pub gaze_epsilon_rad: f32,
    /// Consecutive still frames before the gaze override engages
    pub gaze_run_frames: u32,
    /// Names of the gaze-steered eye joints
    pub eye_joints: (String, String),
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            tick_interval_ms: 33,
            init_timeout_secs: 20.0,
            generation_ready_timeout_secs: 15.0,
            response_timeout_secs: 12.0,
            character_id: 1,
            language: "en".to_string(),
            audio: AudioFormat::default(),
            lead_in_secs: 0.0,
            lead_out_secs: 0.0,
            min_audio_secs: 0.5,
            min_motion_frames: 15,
            min_face_frames: 15,
            motion_fps: 30.0,
            face_fps: 30.0,
            health_margin_secs: 0.25,
            blend_step: 0.1,
            gaze_epsilon_rad: 1e-3,
            gaze_run_frames: 3,
            eye_joints: ("eye_l".to_string(), "eye_r".to_string()),
        }
    }
}

impl SessionConfig {
    /// Load from the store, falling back to defaults key by key
    pub fn load(store: &dyn ConfigStore) -> Self {
        let mut cfg = SessionConfig::default();

        fn parse<T: std::str::FromStr>(store: &dyn ConfigStore, key: &str, out: &mut T) {
            if let Some(raw) = store.get(key) {
                match raw.parse() {
                    Ok(v) => *out = v,
                    Err(_) => tracing::warn!("ignoring unparsable config value for '{key}'"),
                }
            }
        }

        parse(store, "tick_interval_ms", &mut cfg.tick_interval_ms);
        parse(store, "init_timeout_secs", &mut cfg.init_timeout_secs);
        parse(
            store,
            "generation_ready_timeout_secs",
            &mut cfg.generation_ready_timeout_secs,
        );
        parse(store, "response_timeout_secs", &mut cfg.response_timeout_secs);
        parse(store, "character_id", &mut cfg.character_id);
        parse(store, "language", &mut cfg.language);
        parse(store, "min_audio_secs", &mut cfg.min_audio_secs);
        parse(store, "min_motion_frames", &mut cfg.min_motion_frames);
        parse(store, "min_face_frames", &mut cfg.min_face_frames);
        parse(store, "motion_fps", &mut cfg.motion_fps);
        parse(store, "face_fps", &mut cfg.face_fps);
        parse(store, "health_margin_secs", &mut cfg.health_margin_secs);
        parse(store, "blend_step", &mut cfg.blend_step);
        parse(store, "gaze_epsilon_rad", &mut cfg.gaze_epsilon_rad);
        parse(store, "gaze_run_frames", &mut cfg.gaze_run_frames);
        cfg
    }

    /// Merge a config-updated payload: an object of known keys
    pub fn apply_update(&mut self, payload: &serde_json::Value) {
        let Some(map) = payload.as_object() else {
            tracing::warn!("config update payload is not an object, ignoring");
            return;
        };
        let mut patched = serde_json::to_value(&*self).unwrap_or_default();
        if let Some(target) = patched.as_object_mut() {
            for (key, value) in map {
                if target.contains_key(key) {
                    target.insert(key.clone(), value.clone());
                } else {
                    tracing::warn!("ignoring unknown config key '{key}'");
                }
            }
        }
        match serde_json::from_value(patched) {
            Ok(updated) => *self = updated,
            Err(e) => tracing::warn!("config update rejected: {e}"),
        }
    }
}
