//! Loading-progress service
//!
//! Constructor-injected wherever progress is reported, so tests can
//! substitute a fresh instance instead of poking a process-wide global.

use std::sync::Arc;

use parking_lot::Mutex;

/// One progress report
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressReport {
    /// Completion in [0, 1]
    pub progress: f32,
    /// Human-readable status line
    pub text: String,
    /// Which subsystem reported it
    pub source: String,
}

/// Shared progress tracker.
///
/// Cheap to clone; clones observe the same report.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    report: Arc<Mutex<ProgressReport>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.report.lock() = ProgressReport::default();
    }

    pub fn update(&self, progress: f32, text: &str, source: &str) {
        let mut report = self.report.lock();
        report.progress = progress.clamp(0.0, 1.0);
        report.text = text.to_string();
        report.source = source.to_string();
    }

    pub fn get(&self) -> ProgressReport {
        self.report.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_get() {
        let tracker = ProgressTracker::new();
        tracker.update(0.5, "syncing assets", "catalog");

        let report = tracker.get();
        assert_eq!(report.progress, 0.5);
        assert_eq!(report.text, "syncing assets");
        assert_eq!(report.source, "catalog");
    }

    #[test]
    fn test_progress_is_clamped() {
        let tracker = ProgressTracker::new();
        tracker.update(1.5, "", "");
        assert_eq!(tracker.get().progress, 1.0);
        tracker.update(-0.1, "", "");
        assert_eq!(tracker.get().progress, 0.0);
    }

    #[test]
    fn test_reset() {
        let tracker = ProgressTracker::new();
        tracker.update(0.9, "almost", "loader");
        tracker.reset();
        assert_eq!(tracker.get(), ProgressReport::default());
    }
}
