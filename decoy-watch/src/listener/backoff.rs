//! Poll error backoff.

use std::time::Duration;

/// Exponential backoff for consecutive poll failures.
#[derive(Debug, Clone, PartialEq)]
pub struct PollBackoff {
    /// Delay after the first failure in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds.
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter.
    pub use_jitter: bool,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl PollBackoff {
    /// Delay after `failures` consecutive failures (1-based).
    pub fn delay_for_failures(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let base_delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let delay_ms = base_delay.min(self.max_delay_ms as f64) as u64;

        if self.use_jitter {
            let jitter = (delay_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            Duration::from_millis((delay_ms + jitter).min(self.max_delay_ms))
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}
