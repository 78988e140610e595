//! Adaptive readiness-threshold estimation
//!
//! Each channel carries one estimator. The recommendation is the minimum
//! buffered amount (seconds for audio, frames for motion/face) required
//! before playback may begin: raising it trades first-response latency
//! against stutter risk.

/// Estimator tuning
#[derive(Debug, Clone, Copy)]
pub struct EstimatorConfig {
    /// Relative weight of one session's evidence, in (0, 1]
    pub weight: f64,
    /// Lead the channel should keep over the playback cursor
    pub safety_margin: f64,
    /// Lower bound of the recommendation
    pub floor: f64,
    /// Upper bound; prevents runaway growth on a persistently bad link
    pub ceiling: f64,
}

impl EstimatorConfig {
    pub fn with_floor(floor: f64) -> Self {
        EstimatorConfig {
            weight: 0.25,
            safety_margin: floor * 0.5,
            floor,
            ceiling: floor * 4.0,
        }
    }
}

/// Per-channel recommended minimum buffering amount
#[derive(Debug, Clone)]
pub struct BufferSizeEstimator {
    cfg: EstimatorConfig,
    value: f64,
}

impl BufferSizeEstimator {
    pub fn new(cfg: EstimatorConfig) -> Self {
        let value = cfg.floor;
        BufferSizeEstimator { cfg, value }
    }

    /// Current recommendation, in the channel's native unit
    pub fn recommendation(&self) -> f64 {
        self.value
    }

    /// Fold in one finished session: `underruns` is how often the channel
    /// ran below the safety margin mid-playback, `surplus` the unused
    /// buffered amount left when the session completed.
    pub fn record_session(&mut self, underruns: u32, surplus: f64) {
        if underruns > 0 {
            self.value += self.cfg.weight * self.cfg.safety_margin * underruns as f64;
        } else if surplus > self.cfg.safety_margin {
            self.value -= self.cfg.weight * (surplus - self.cfg.safety_margin);
        }
        self.value = self.value.clamp(self.cfg.floor, self.cfg.ceiling);
    }
}

/// One estimator per stream channel
#[derive(Debug, Clone)]
pub struct ChannelEstimators {
    pub audio: BufferSizeEstimator,
    pub motion: BufferSizeEstimator,
    pub face: BufferSizeEstimator,
}

impl ChannelEstimators {
    /// Audio floor in seconds; motion and face floors in frames
    pub fn new(audio_floor_secs: f64, motion_floor_frames: f64, face_floor_frames: f64) -> Self {
        ChannelEstimators {
            audio: BufferSizeEstimator::new(EstimatorConfig::with_floor(audio_floor_secs)),
            motion: BufferSizeEstimator::new(EstimatorConfig::with_floor(motion_floor_frames)),
            face: BufferSizeEstimator::new(EstimatorConfig::with_floor(face_floor_frames)),
        }
    }
}
