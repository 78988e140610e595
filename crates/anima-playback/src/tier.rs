//! Animation tier storage

use anima_clip::{FaceClip, MotionClip, Quat, Vec3};

/// The three blend sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Perpetual baseline
    Idle,
    /// Chosen pre-baked clip variant
    Local,
    /// Incrementally appended network data
    Streamed,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Idle => write!(f, "idle"),
            Tier::Local => write!(f, "local"),
            Tier::Streamed => write!(f, "streamed"),
        }
    }
}

/// Frame-major joint rotations and root translations for one tier
#[derive(Debug, Default)]
pub struct JointTrack {
    rotations: Vec<Vec<Quat>>,
    translations: Vec<Vec3>,
    loop_range: Option<(usize, usize)>,
    /// Presentation-time shift: frames to wait before content begins
    start_delay: usize,
}

impl JointTrack {
    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.rotations.clear();
        self.translations.clear();
        self.loop_range = None;
        self.start_delay = 0;
    }

    /// Replace contents from a clip; rotations convert to unit quaternions
    pub fn load(&mut self, clip: &MotionClip, loop_range: Option<(usize, usize)>) {
        self.clear();
        self.loop_range = loop_range;
        self.append(clip);
    }

    /// Append without discarding unplayed frames
    pub fn append(&mut self, clip: &MotionClip) {
        for frame in clip.frames() {
            self.rotations
                .push(frame.rotations.iter().map(|m| m.to_quat()).collect());
            self.translations.push(frame.translation);
        }
    }

    pub fn set_loop_range(&mut self, range: Option<(usize, usize)>) {
        self.loop_range = range;
    }

    pub fn loop_range(&self) -> Option<(usize, usize)> {
        self.loop_range
    }

    pub fn set_start_delay(&mut self, frames: usize) {
        self.start_delay = frames;
    }

    pub fn start_delay(&self) -> usize {
        self.start_delay
    }

    /// Map a playback cursor to a stored frame index: apply the start
    /// delay, wrap into the loop range, clamp to the last frame otherwise.
    pub fn frame_index(&self, cursor: usize) -> Option<usize> {
        if self.rotations.is_empty() {
            return None;
        }
        let cursor = cursor.saturating_sub(self.start_delay);
        let idx = match self.loop_range {
            Some((start, end)) if end > start && start < self.rotations.len() => {
                let end = end.min(self.rotations.len());
                if cursor < end {
                    cursor
                } else {
                    start + (cursor - start) % (end - start)
                }
            }
            _ => cursor.min(self.rotations.len() - 1),
        };
        Some(idx)
    }

    pub fn rotations_at(&self, cursor: usize) -> Option<&[Quat]> {
        self.frame_index(cursor)
            .map(|i| self.rotations[i].as_slice())
    }

    pub fn translation_at(&self, cursor: usize) -> Option<Vec3> {
        self.frame_index(cursor).map(|i| self.translations[i])
    }

    /// Has a non-looping track been fully traversed at `cursor`?
    pub fn finished(&self, cursor: usize) -> bool {
        if self.loop_range.is_some() {
            return false;
        }
        cursor.saturating_sub(self.start_delay) + 1 >= self.rotations.len()
    }
}

/// Frame-major blendshape weights for one tier
#[derive(Debug, Default)]
pub struct MorphTrack {
    weights: Vec<Vec<f32>>,
    loop_range: Option<(usize, usize)>,
    start_delay: usize,
}

impl MorphTrack {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn clear(&mut self) {
        self.weights.clear();
        self.loop_range = None;
        self.start_delay = 0;
    }

    pub fn load(&mut self, clip: &FaceClip, loop_range: Option<(usize, usize)>) {
        self.clear();
        self.loop_range = loop_range;
        self.append(clip);
    }

    pub fn append(&mut self, clip: &FaceClip) {
        for frame in clip.frames() {
            self.weights.push(frame.weights.clone());
        }
    }

    pub fn set_start_delay(&mut self, frames: usize) {
        self.start_delay = frames;
    }

    pub fn frame_index(&self, cursor: usize) -> Option<usize> {
        if self.weights.is_empty() {
            return None;
        }
        let cursor = cursor.saturating_sub(self.start_delay);
        let idx = match self.loop_range {
            Some((start, end)) if end > start && start < self.weights.len() => {
                let end = end.min(self.weights.len());
                if cursor < end {
                    cursor
                } else {
                    start + (cursor - start) % (end - start)
                }
            }
            _ => cursor.min(self.weights.len() - 1),
        };
        Some(idx)
    }

    pub fn weights_at(&self, cursor: usize) -> Option<&[f32]> {
        self.frame_index(cursor).map(|i| self.weights[i].as_slice())
    }

    /// Has a non-looping track been fully traversed at `cursor`?
    pub fn finished(&self, cursor: usize) -> bool {
        if self.loop_range.is_some() {
            return false;
        }
        cursor.saturating_sub(self.start_delay) + 1 >= self.weights.len()
    }
}
