use std::time::Duration;

use crate::core::config::BackoffSettings;

pub(crate) const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Exponential delay between failed polls: `initial * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackoffPolicy {
    initial: Duration,
    max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl BackoffPolicy {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max: max.max(initial) }
    }

    pub(crate) fn from_settings(settings: &BackoffSettings) -> Self {
        Self::new(settings.initial(), settings.max())
    }

    /// `consecutive_errors` counts from 1; zero is treated as the first error.
    pub(crate) fn delay(&self, consecutive_errors: u32) -> Duration {
        let exponent = consecutive_errors.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial.checked_mul(factor).map_or(self.max, |delay| delay.min(self.max))
    }
}
