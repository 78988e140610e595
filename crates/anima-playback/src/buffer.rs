//! Per-character playback buffer and pose resolution

use std::collections::HashMap;

use rand::seq::SliceRandom;

use anima_clip::{FaceClip, MotionClip, Quat, Vec3};
use anima_core::{AnimaError, AnimaResult, EventBus};

use crate::{GazeConfig, GazeGate, JointTrack, MorphTrack, Tier};

/// Notifications published as streamed data moves through the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// First streamed append after a clear; drives the loading UI
    FirstStreamedData,
    /// Streamed tier grew; drives completion detection
    StreamedDurationChanged {
        motion_frames: usize,
        face_frames: usize,
    },
    /// A tier was discarded; consumers treat this as finished
    TierCleared { tier: Tier },
}

/// Buffer tuning
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub gaze: GazeConfig,
    /// Names of the two gaze-steered eye joints
    pub eye_joints: (String, String),
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            gaze: GazeConfig::default(),
            eye_joints: ("eye_l".to_string(), "eye_r".to_string()),
        }
    }
}

/// One resolved skeleton pose
#[derive(Debug, Clone)]
pub struct ResolvedPose {
    pub rotations: Vec<Quat>,
    pub translation: Vec3,
}

/// One resolved facial expression
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub weights: Vec<f32>,
}

struct TierPair {
    joints: JointTrack,
    morphs: MorphTrack,
}

impl TierPair {
    fn new() -> Self {
        TierPair {
            joints: JointTrack::default(),
            morphs: MorphTrack::default(),
        }
    }
}

/// Three-tier blending buffer for one character
pub struct AnimationPlaybackBuffer {
    joint_names: Vec<String>,
    blendshape_names: Vec<String>,
    eye_indices: Option<(usize, usize)>,

    idle: TierPair,
    local: TierPair,
    streamed: TierPair,
    active: Tier,

    motion_variants: HashMap<String, Vec<(MotionClip, Option<(usize, usize)>)>>,
    face_variants: HashMap<String, Vec<FaceClip>>,

    gaze: GazeGate,
    events: EventBus<PlaybackEvent>,
    streamed_primed: bool,

    pose_out: ResolvedPose,
    face_out: ResolvedFace,
}

impl AnimationPlaybackBuffer {
    pub fn new(
        joint_names: Vec<String>,
        blendshape_names: Vec<String>,
        cfg: PlaybackConfig,
    ) -> Self {
        let eye_indices = {
            let left = joint_names.iter().position(|n| *n == cfg.eye_joints.0);
            let right = joint_names.iter().position(|n| *n == cfg.eye_joints.1);
            match (left, right) {
                (Some(l), Some(r)) => Some((l, r)),
                _ => None,
            }
        };

        let pose_out = ResolvedPose {
            rotations: vec![Quat::identity(); joint_names.len()],
            translation: Vec3::ZERO,
        };
        let face_out = ResolvedFace {
            weights: vec![0.0; blendshape_names.len()],
        };

        AnimationPlaybackBuffer {
            joint_names,
            blendshape_names,
            eye_indices,
            idle: TierPair::new(),
            local: TierPair::new(),
            streamed: TierPair::new(),
            active: Tier::Local,
            motion_variants: HashMap::new(),
            face_variants: HashMap::new(),
            gaze: GazeGate::new(cfg.gaze),
            events: EventBus::new(),
            streamed_primed: false,
            pose_out,
            face_out,
        }
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn blendshape_names(&self) -> &[String] {
        &self.blendshape_names
    }

    /// Bus carrying first-data / duration / cleared notifications
    pub fn events(&self) -> EventBus<PlaybackEvent> {
        self.events.clone()
    }

    fn tier(&self, tier: Tier) -> &TierPair {
        match tier {
            Tier::Idle => &self.idle,
            Tier::Local => &self.local,
            Tier::Streamed => &self.streamed,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut TierPair {
        match tier {
            Tier::Idle => &mut self.idle,
            Tier::Local => &mut self.local,
            Tier::Streamed => &mut self.streamed,
        }
    }

    /// Which tier is the blend's right-hand source
    pub fn active_tier(&self) -> Tier {
        self.active
    }

    pub fn set_active_tier(&mut self, tier: Tier) {
        self.active = tier;
    }

    // ---- variant registry ------------------------------------------------

    pub fn register_motion_variant(
        &mut self,
        label: &str,
        clip: MotionClip,
        loop_range: Option<(usize, usize)>,
    ) -> AnimaResult<()> {
        self.check_joints(&clip)?;
        self.motion_variants
            .entry(label.to_string())
            .or_default()
            .push((clip, loop_range));
        Ok(())
    }

    pub fn register_face_variant(&mut self, label: &str, clip: FaceClip) -> AnimaResult<()> {
        self.check_blendshapes(&clip)?;
        self.face_variants
            .entry(label.to_string())
            .or_default()
            .push(clip);
        Ok(())
    }

    /// Replace a tier's joint content with one randomly chosen registered
    /// variant under `label`; random choice keeps repeated idles from
    /// looking identical.
    pub fn switch_joint_animation(&mut self, label: &str, tier: Tier) -> AnimaResult<()> {
        let (clip, loop_range) = self
            .motion_variants
            .get(label)
            .and_then(|v| v.choose(&mut rand::thread_rng()))
            .cloned()
            .ok_or_else(|| AnimaError::AssetNotFound(label.to_string()))?;
        tracing::debug!("switching {tier} joints to '{label}'");
        self.tier_mut(tier).joints.load(&clip, loop_range);
        if tier == Tier::Streamed {
            self.streamed_primed = false;
        }
        Ok(())
    }

    /// Replace a tier's morph content with a random face variant under
    /// `label`, or clear the tier if no matching variant exists.
    pub fn switch_morph_animation(&mut self, label: &str, tier: Tier) {
        let clip = self
            .face_variants
            .get(label)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.choose(&mut rand::thread_rng()))
            .cloned();
        match clip {
            Some(clip) => {
                tracing::debug!("switching {tier} morphs to '{label}'");
                self.tier_mut(tier).morphs.load(&clip, None);
            }
            None => {
                tracing::debug!("no face variant under '{label}', clearing {tier} morphs");
                self.tier_mut(tier).morphs.clear();
            }
        }
    }

    // ---- streamed appends ------------------------------------------------

    /// Prepare the streamed tier for a new turn: discard stale data and
    /// apply the per-channel presentation-time shifts, in frames.
    pub fn begin_streamed_turn(&mut self, motion_delay: usize, face_delay: usize) {
        self.streamed.joints.clear();
        self.streamed.morphs.clear();
        self.streamed.joints.set_start_delay(motion_delay);
        self.streamed.morphs.set_start_delay(face_delay);
        self.streamed_primed = false;
        self.gaze.reset();
    }

    /// Append streamed motion without discarding unplayed frames
    pub fn append_streamed_motion(&mut self, clip: &MotionClip) -> AnimaResult<()> {
        self.check_joints(clip)?;
        let fire_first = !self.streamed_primed && self.streamed.joints.is_empty();
        self.streamed.joints.append(clip);
        self.after_streamed_append(fire_first);
        Ok(())
    }

    /// Append streamed face weights without discarding unplayed frames
    pub fn append_streamed_face(&mut self, clip: &FaceClip) -> AnimaResult<()> {
        self.check_blendshapes(clip)?;
        let fire_first = !self.streamed_primed && self.streamed.morphs.is_empty();
        self.streamed.morphs.append(clip);
        self.after_streamed_append(fire_first);
        Ok(())
    }

    fn after_streamed_append(&mut self, fire_first: bool) {
        if fire_first && !self.streamed_primed {
            self.streamed_primed = true;
            self.events.publish(&PlaybackEvent::FirstStreamedData);
        }
        self.events.publish(&PlaybackEvent::StreamedDurationChanged {
            motion_frames: self.streamed.joints.len(),
            face_frames: self.streamed.morphs.len(),
        });
    }

    // ---- clears ----------------------------------------------------------

    pub fn clear_joint_animation(&mut self, tier: Tier) {
        self.tier_mut(tier).joints.clear();
        if tier == Tier::Streamed {
            self.streamed_primed = false;
        }
        self.events.publish(&PlaybackEvent::TierCleared { tier });
    }

    pub fn clear_morph_animation(&mut self, tier: Tier) {
        self.tier_mut(tier).morphs.clear();
        self.events.publish(&PlaybackEvent::TierCleared { tier });
    }

    /// Frames currently held by a tier's joint track
    pub fn joint_frames(&self, tier: Tier) -> usize {
        self.tier(tier).joints.len()
    }

    pub fn morph_frames(&self, tier: Tier) -> usize {
        self.tier(tier).morphs.len()
    }

    /// Non-looping tier fully traversed at `cursor`?
    pub fn tier_finished(&self, tier: Tier, cursor: usize) -> bool {
        let pair = self.tier(tier);
        (pair.joints.is_empty() || pair.joints.finished(cursor))
            && (pair.morphs.is_empty() || pair.morphs.finished(cursor))
    }

    pub fn gaze_active(&self) -> bool {
        self.gaze.active()
    }

    /// Loop range passthrough for a tier's joint track
    pub fn set_loop_range(&mut self, tier: Tier, range: Option<(usize, usize)>) {
        self.tier_mut(tier).joints.set_loop_range(range);
    }

    // ---- pose resolution -------------------------------------------------

    /// The render-loop entry point: blend the idle tier at `left_frame`
    /// against the active tier at `right_frame` with `weight` in [0, 1].
    /// Weight 0 reproduces the idle tier exactly, weight 1 the active tier.
    ///
    /// Never blocks and does not allocate: output buffers are preallocated
    /// at construction.
    pub fn resolve_pose(
        &mut self,
        left_frame: usize,
        right_frame: usize,
        weight: f32,
    ) -> (&ResolvedPose, &ResolvedFace) {
        let weight = weight.clamp(0.0, 1.0);

        let active = match self.active {
            Tier::Idle => &self.idle,
            Tier::Local => &self.local,
            Tier::Streamed => &self.streamed,
        };

        let left_rot = self.idle.joints.rotations_at(left_frame);
        let right_rot = active.joints.rotations_at(right_frame);

        // Gaze detection watches the active tier's eye joints
        if let (Some((l, r)), Some(rot)) = (self.eye_indices, right_rot) {
            self.gaze.observe(&rot[l], &rot[r]);
        }
        let gaze_active = self.gaze.active();

        for j in 0..self.joint_names.len() {
            let a = left_rot.map_or_else(Quat::identity, |r| r[j]);
            let b = right_rot.map_or(a, |r| r[j]);

            let excluded = gaze_active
                && self
                    .eye_indices
                    .map_or(false, |(l, r)| j == l || j == r);
            self.pose_out.rotations[j] = if excluded { a } else { a.slerp(&b, weight) };
        }

        let left_t = self.idle.joints.translation_at(left_frame).unwrap_or(Vec3::ZERO);
        let right_t = active.joints.translation_at(right_frame).unwrap_or(left_t);
        self.pose_out.translation = if weight <= 0.0 {
            left_t
        } else if weight >= 1.0 {
            right_t
        } else {
            left_t.lerp(&right_t, weight)
        };

        let left_w = self.idle.morphs.weights_at(left_frame);
        let right_w = active.morphs.weights_at(right_frame);
        for (i, out) in self.face_out.weights.iter_mut().enumerate() {
            let a = left_w.map_or(0.0, |w| w[i]);
            let b = right_w.map_or(a, |w| w[i]);
            *out = if weight <= 0.0 {
                a
            } else if weight >= 1.0 {
                b
            } else {
                a + (b - a) * weight
            };
        }

        (&self.pose_out, &self.face_out)
    }

    // ---- validation ------------------------------------------------------

    fn check_joints(&self, clip: &MotionClip) -> AnimaResult<()> {
        if clip.joint_names() != self.joint_names.as_slice() {
            return Err(AnimaError::ClipNameMismatch(format!(
                "clip joints {:?} do not match character joints {:?}",
                clip.joint_names(),
                self.joint_names
            )));
        }
        Ok(())
    }

    fn check_blendshapes(&self, clip: &FaceClip) -> AnimaResult<()> {
        if clip.blendshape_names() != self.blendshape_names.as_slice() {
            return Err(AnimaError::ClipNameMismatch(format!(
                "clip blendshapes {:?} do not match character blendshapes {:?}",
                clip.blendshape_names(),
                self.blendshape_names
            )));
        }
        Ok(())
    }
}
