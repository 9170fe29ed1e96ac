//! Test support utilities for tether integration tests.
//!
//! Provides isolated database locations and collaborator fakes.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tether::core::cipher::{Aes256, Cipher, MasterKey};
use tether::core::store::{RecordStore, RetryPolicy};
use tether::{Config, Context};

/// Test environment with its own temp directory for databases.
///
/// Nothing touches the process environment, so tests run in parallel.
pub struct Test {
    pub dir: TempDir,
    pub config: Config,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut config = Config::parse(&format!("secret = \"{TEST_SECRET}\"")).unwrap();
        config.credentials_db = dir.path().join("credentials.db");
        config.sessions_db = dir.path().join("sessions.db");
        config.store.backoff_ms = 10;
        Self { dir, config }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Open a full context over this environment's databases.
    pub fn context(&self) -> Context {
        Context::open(&self.config).expect("failed to open context")
    }

    /// Open a record store directly, with a fixed key (skips PBKDF2).
    pub fn store(&self, name: &str, retry: RetryPolicy) -> RecordStore {
        RecordStore::open(&self.path(name), cipher(), retry).expect("failed to open store")
    }
}

/// A cipher over a fixed test key.
pub fn cipher() -> Arc<dyn Cipher> {
    Arc::new(Aes256::new(&MasterKey::from_bytes([42u8; 32])))
}

/// Retry policy for contention tests: fail fast in SQLite, retry in tether.
pub fn eager_retry(attempts: u32, backoff_ms: u64) -> RetryPolicy {
    RetryPolicy {
        attempts,
        backoff: Duration::from_millis(backoff_ms),
        busy_timeout: Duration::ZERO,
    }
}
