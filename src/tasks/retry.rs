//! Retry policy: attempt ceiling and fixed backoff.

use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(300);

/// Retry policy for one task kind.
///
/// `max_attempts` counts every attempt, the first one included. The delay
/// between attempts is fixed, never exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Best-effort tasks: one attempt, failures are only logged.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay_after(&self, _attempt: u32) -> Duration {
        self.backoff
    }
}

impl From<&crate::config::TaskSettings> for RetryPolicy {
    fn from(settings: &crate::config::TaskSettings) -> Self {
        Self::new(settings.max_attempts.get(), settings.backoff)
    }
}
