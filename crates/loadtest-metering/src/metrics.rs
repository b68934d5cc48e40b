//! Counters for an emission run.

use std::time::Duration;

/// Metrics from a continuous emission run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionMetrics {
    /// Batches accepted by the transport.
    pub batches_submitted: u64,
    /// Readings across all accepted batches.
    pub readings_submitted: u64,
    /// Full passes over the working set.
    pub cycles_completed: u64,
    /// Re-submissions under a retry policy.
    pub retries: u64,
    pub elapsed: Duration,
}

impl EmissionMetrics {
    /// Calculate batches per second.
    pub fn batches_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.batches_submitted as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
