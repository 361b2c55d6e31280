//! Time utilities and constants for xrate.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Timing constants.
pub mod constants {
    use super::Duration;

    /// Age after which a rate snapshot is considered stale (1 hour).
    pub fn default_max_age() -> Duration {
        Duration::hours(1)
    }

    /// Upper bound on a single remote refresh (10 seconds).
    pub fn default_request_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
}

/// A timestamp (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current wall-clock timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Source of the current time.
///
/// Everything that stamps or ages a snapshot reads time through this trait
/// so tests can move time forward without sleeping.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// Manually driven clock for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct ManualClock {
    current: parking_lot::Mutex<Timestamp>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: parking_lot::Mutex::new(start),
        }
    }

    /// Create a clock frozen at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current = *current + by;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Timestamp) {
        *self.current.lock() = to;
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}
