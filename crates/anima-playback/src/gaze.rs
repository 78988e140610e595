//! Eye-gaze override gate
//!
//! While streamed eye-joint motion is effectively still, an external gaze
//! subsystem steers the eyes; the gate detects that condition and excludes
//! the eye joints from blending while it holds.

use anima_clip::Quat;

/// Gate tuning. The trigger threshold is deliberately a tunable: desired
/// override timing should be verified empirically per character rig.
#[derive(Debug, Clone, Copy)]
pub struct GazeConfig {
    /// Eye rotation magnitude below this counts as still, in radians
    pub epsilon_rad: f32,
    /// Consecutive still frames required before the override engages
    pub run_frames: u32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        GazeConfig {
            epsilon_rad: 1e-3,
            run_frames: 3,
        }
    }
}

/// Tracks eye-joint stillness across resolved frames
#[derive(Debug)]
pub struct GazeGate {
    cfg: GazeConfig,
    still_run: u32,
    active: bool,
}

impl GazeGate {
    pub fn new(cfg: GazeConfig) -> Self {
        GazeGate {
            cfg,
            still_run: 0,
            active: false,
        }
    }

    /// Feed the active tier's eye rotations for the frame being resolved.
    /// Returns whether the override is engaged for this frame.
    pub fn observe(&mut self, left_eye: &Quat, right_eye: &Quat) -> bool {
        let magnitude = left_eye
            .angle_to_identity()
            .max(right_eye.angle_to_identity());

        if magnitude < self.cfg.epsilon_rad {
            self.still_run = self.still_run.saturating_add(1);
            if self.still_run >= self.cfg.run_frames {
                if !self.active {
                    tracing::debug!("gaze override engaged");
                }
                self.active = true;
            }
        } else {
            // Non-trivial eye motion releases the override instantly
            if self.active {
                tracing::debug!("gaze override released");
            }
            self.still_run = 0;
            self.active = false;
        }
        self.active
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.still_run = 0;
        self.active = false;
    }
}
