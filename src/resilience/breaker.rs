//! Consecutive-failure circuit breaker.
//!
//! Closed/open is derived from a counter rather than stored: a success resets
//! the counter, a failure increments it, and the breaker is open whenever the
//! counter has reached the threshold. There is no half-open state; once open
//! it stays open until the owning episode ends.

use serde::{Deserialize, Serialize};

/// Per-episode failure counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    failure_count: u32,
    threshold: u32,
}

impl CircuitBreaker {
    /// A closed breaker. A zero threshold is raised to 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            failure_count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
    }

    pub fn is_open(&self) -> bool {
        self.failure_count >= self.threshold
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5)
    }
}
