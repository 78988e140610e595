//! Per-channel arrival bookkeeping
//!
//! Health data records what arrived and when; it never feeds playback.
//! The orchestrator compares the snapshot against its playback cursor to
//! decide pause and resume.

use anima_core::SessionTime;

/// The three multiplexed stream channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Audio,
    Motion,
    Face,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Audio, ChannelKind::Motion, ChannelKind::Face];
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Audio => write!(f, "audio"),
            ChannelKind::Motion => write!(f, "motion"),
            ChannelKind::Face => write!(f, "face"),
        }
    }
}

/// One recorded chunk arrival
#[derive(Debug, Clone, Copy)]
pub struct StreamChunk {
    pub received_at: SessionTime,
    pub frames: u32,
    pub duration_secs: f64,
}

/// Rolling arrival window kept per chunk record; totals are cumulative
const MAX_CHUNK_WINDOW: usize = 256;

/// Arrival record for one channel
#[derive(Debug, Default)]
pub struct NetworkStream {
    chunks: Vec<StreamChunk>,
    total_frames: u64,
    total_secs: f64,
    ended_at: Option<SessionTime>,
}

impl NetworkStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chunk(&mut self, received_at: SessionTime, frames: u32, duration_secs: f64) {
        self.chunks.push(StreamChunk {
            received_at,
            frames,
            duration_secs,
        });
        if self.chunks.len() > MAX_CHUNK_WINDOW {
            self.chunks.remove(0);
        }
        self.total_frames += frames as u64;
        self.total_secs += duration_secs;
    }

    /// Stamp end-of-stream; only the first stamp sticks
    pub fn end(&mut self, at: SessionTime) {
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
    }

    pub fn ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn ended_at(&self) -> Option<SessionTime> {
        self.ended_at
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn last_arrival(&self) -> Option<SessionTime> {
        self.chunks.last().map(|c| c.received_at)
    }

    pub fn chunks(&self) -> &[StreamChunk] {
        &self.chunks
    }

    pub fn snapshot(&self) -> ChannelHealth {
        ChannelHealth {
            received_frames: self.total_frames,
            received_secs: self.total_secs,
            ended: self.ended(),
            last_arrival: self.last_arrival(),
        }
    }
}

/// Point-in-time view of one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelHealth {
    pub received_frames: u64,
    pub received_secs: f64,
    pub ended: bool,
    pub last_arrival: Option<SessionTime>,
}

impl ChannelHealth {
    /// Seconds of material ahead of a playback position
    pub fn lead_secs(&self, played_secs: f64) -> f64 {
        self.received_secs - played_secs
    }
}

/// Point-in-time view of all three channels
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthSnapshot {
    pub audio: ChannelHealth,
    pub motion: ChannelHealth,
    pub face: ChannelHealth,
}

impl HealthSnapshot {
    pub fn channel(&self, kind: ChannelKind) -> &ChannelHealth {
        match kind {
            ChannelKind::Audio => &self.audio,
            ChannelKind::Motion => &self.motion,
            ChannelKind::Face => &self.face,
        }
    }

    pub fn all_ended(&self) -> bool {
        self.audio.ended && self.motion.ended && self.face.ended
    }

    /// First still-open channel with less than `margin_secs` of lead over
    /// the playback position, if any
    pub fn starving(&self, played_secs: f64, margin_secs: f64) -> Option<ChannelKind> {
        ChannelKind::ALL.into_iter().find(|kind| {
            let ch = self.channel(*kind);
            !ch.ended && ch.lead_secs(played_secs) < margin_secs
        })
    }

    /// Every channel has either ended or regained the safety margin
    pub fn regained(&self, played_secs: f64, margin_secs: f64) -> bool {
        self.starving(played_secs, margin_secs).is_none()
    }
}
