//! Refresh statistics for long-running commands.

use std::collections::VecDeque;

/// Counters for refresh attempts made by `watch`.
#[derive(Debug, Clone)]
pub struct RefreshStats {
    /// Refreshes attempted.
    pub attempts: u64,
    /// Refreshes that installed a new snapshot.
    pub successes: u64,
    /// Refreshes that left the previous snapshot in place.
    pub failures: u64,
    /// Checks that found the snapshot fresh and skipped the network.
    pub skipped: u64,
    /// Error code of the most recent failure.
    pub last_error: Option<&'static str>,
    /// Refresh latency samples (ms).
    latency_samples: VecDeque<u64>,
    max_samples: usize,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            successes: 0,
            failures: 0,
            skipped: 0,
            last_error: None,
            latency_samples: VecDeque::with_capacity(256),
            max_samples: 256,
        }
    }

    pub fn record_success(&mut self, latency_ms: u64) {
        self.attempts += 1;
        self.successes += 1;
        self.push_sample(latency_ms);
    }

    pub fn record_failure(&mut self, latency_ms: u64, error_code: &'static str) {
        self.attempts += 1;
        self.failures += 1;
        self.last_error = Some(error_code);
        self.push_sample(latency_ms);
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Average refresh latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Fraction of attempts that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }

        self.successes as f64 / self.attempts as f64
    }

    fn push_sample(&mut self, latency_ms: u64) {
        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_ms);
    }
}

impl Default for RefreshStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let mut stats = RefreshStats::new();

        stats.record_success(100);
        stats.record_success(200);
        stats.record_failure(150, "TIMEOUT");
        stats.record_success(150);
        stats.record_skip();

        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.successes, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.last_error, Some("TIMEOUT"));
        assert_eq!(stats.average_latency_ms(), 150);
        assert_eq!(stats.success_rate(), 0.75);
    }

    #[test]
    fn test_sample_window_is_bounded() {
        let mut stats = RefreshStats::new();
        for _ in 0..300 {
            stats.record_success(10);
        }
        stats.record_success(10);

        assert_eq!(stats.latency_samples.len(), 256);
    }
}
