//! Retry policy for rate-limited backend calls.
//!
//! Linear backoff: the wait before retry `n` (1-based) is `5 * n` units.
//! With the default three attempts that is 5 then 10 units. No jitter.

use backoff::backoff::Backoff;
use std::time::Duration;

use diary_types::{CapsuleSettings, MAX_ATTEMPTS};

/// Backoff multiplier applied per retry, in units.
const UNITS_PER_RETRY: u32 = 5;

/// Attempt ceiling and backoff unit for capsule generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is capped at [`MAX_ATTEMPTS`].
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.min(MAX_ATTEMPTS),
            backoff_unit,
        }
    }

    /// Create a policy from settings.
    pub fn from_settings(settings: &CapsuleSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.backoff_unit_ms),
        )
    }

    /// Maximum number of backend calls per capsule.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Length of one backoff unit.
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Fresh backoff sequence for one generation.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff {
            step: self.backoff_unit * UNITS_PER_RETRY,
            max_delays: self.max_attempts.saturating_sub(1),
            issued: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Linearly growing delays, exhausted after `max_attempts - 1` waits.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max_delays: u32,
    issued: u32,
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.issued = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.issued >= self.max_delays {
            return None;
        }
        self.issued += 1;
        Some(self.step * self.issued)
    }
}
