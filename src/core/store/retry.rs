//! Bounded retry for writes that hit SQLite lock contention.

use std::time::Duration;

use rusqlite::ErrorCode;
use tracing::debug;

use crate::core::constants::{STORE_ATTEMPTS, STORE_BACKOFF_MS, STORE_BUSY_TIMEOUT_MS};
use crate::error::{Result, StoreError};

/// How hard a store tries before reporting `StoreBusy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
    /// SQLite's own wait on a locked database, per statement.
    pub busy_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: STORE_ATTEMPTS,
            backoff: Duration::from_millis(STORE_BACKOFF_MS),
            busy_timeout: Duration::from_millis(STORE_BUSY_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with something other than lock
    /// contention, or the attempts run out.
    pub(super) fn run<T>(&self, mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if is_busy(&e) => {
                    debug!(attempt, attempts, "store busy");
                    if attempt < attempts {
                        std::thread::sleep(self.backoff);
                    }
                }
                Err(e) => return Err(StoreError::Sqlite(e).into()),
            }
        }
        Err(StoreError::Busy { attempts }.into())
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}
