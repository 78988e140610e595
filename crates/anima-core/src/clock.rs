//! Monotonic session clock
//!
//! Every network-dependent wait in the engine is bounded against this clock;
//! arrival stamps in the health bookkeeping come from it as well.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::SessionTime;

/// Monotonic clock anchored at session start.
///
/// Cheap to clone; clones share the same epoch.
#[derive(Clone, Debug)]
pub struct SessionClock {
    origin: Arc<Instant>,
}

impl SessionClock {
    /// Create a clock whose epoch is now
    pub fn start() -> Self {
        SessionClock {
            origin: Arc::new(Instant::now()),
        }
    }

    /// Current session time
    pub fn now(&self) -> SessionTime {
        SessionTime::from_micros(self.origin.elapsed().as_micros() as i64)
    }

    /// Has `deadline` passed?
    pub fn expired(&self, deadline: SessionTime) -> bool {
        self.now() >= deadline
    }

    /// Deadline `timeout` from now
    pub fn deadline_in(&self, timeout: Duration) -> SessionTime {
        self.now() + timeout
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = SessionClock::start();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_clones_share_epoch() {
        let clock = SessionClock::start();
        let other = clock.clone();
        let a = clock.now();
        let b = other.now();
        assert!(b.since(a) < Duration::from_millis(50));
    }

    #[test]
    fn test_deadline() {
        let clock = SessionClock::start();
        let deadline = clock.deadline_in(Duration::from_secs(60));
        assert!(!clock.expired(deadline));
        assert!(clock.expired(clock.now()));
    }
}
