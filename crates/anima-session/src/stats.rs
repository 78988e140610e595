//! Loop counters, readable by the frontend

/// Counters accumulated over the machine's lifetime
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub events_dispatched: u64,
    pub events_reenqueued: u64,
    pub events_ignored: u64,
    pub transitions: u64,
    pub turns_started: u64,
    pub turns_failed: u64,
    pub playback_pauses: u64,
    pub playback_resumes: u64,
    pub config_updates: u64,
}
