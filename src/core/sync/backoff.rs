//! Exponential backoff for rate-limited fetches.

use std::time::Duration;

use crate::core::constants::{SYNC_ATTEMPTS, SYNC_BASE_DELAY_MS, SYNC_MAX_DELAY_MS};

/// Delay schedule: `base * 2^n`, capped at `max_delay`, for `attempts - 1`
/// waits between `attempts` tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: SYNC_ATTEMPTS,
            base_delay: Duration::from_millis(SYNC_BASE_DELAY_MS),
            max_delay: Duration::from_millis(SYNC_MAX_DELAY_MS),
        }
    }
}

impl Backoff {
    /// Wait before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// The waits between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.attempts.saturating_sub(1)).map(|retry| self.delay(retry))
    }
}
