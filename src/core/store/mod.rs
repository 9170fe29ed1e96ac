//! Encrypted record storage.
//!
//! A durable key-value map on SQLite. One instance per logical store
//! (credentials, sessions); rows carry a `tag` so a store can be enumerated
//! by category.
//!
//! The database runs in WAL mode so several worker processes can open the
//! same file: readers don't block the writer, and a writer that finds the
//! lock held retries a bounded number of times (see [`RetryPolicy`]).
//!
//! Values are encrypted with the injected [`Cipher`], using the record key as
//! associated data. Keys and tags are stored in plaintext.
//!
//! ## Secret rotation
//!
//! Rows written under one secret cannot be read under another. Such rows
//! surface as `StoreError::Corrupt` naming the key; they are never skipped
//! or overwritten silently.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, trace, warn};

use crate::core::cipher::Cipher;
use crate::error::{Error, Result, StoreError};

mod retry;

pub use retry::RetryPolicy;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    tag TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Encrypted key-value store.
pub struct RecordStore {
    conn: Mutex<Connection>,
    cipher: Arc<dyn Cipher>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("cipher", &self.cipher.name())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open (or create) a store at `path`.
    ///
    /// Creates the parent directory, switches the database to WAL mode and
    /// creates the schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the file can't be opened or
    /// initialized, `StoreError::Busy` if another process holds the schema
    /// lock for longer than the retry policy allows.
    pub fn open(path: &Path, cipher: Arc<dyn Cipher>, retry: RetryPolicy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(path = %path.display(), "opening record store");
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        conn.busy_timeout(retry.busy_timeout)
            .map_err(StoreError::Sqlite)?;
        retry.run(|| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            conn.execute(SCHEMA, [])
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
            retry,
        })
    }

    /// Create a private in-memory store (for testing).
    pub fn in_memory(cipher: Arc<dyn Cipher>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        conn.execute(SCHEMA, []).map_err(StoreError::Sqlite)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
            retry: RetryPolicy::default(),
        })
    }

    /// Insert or replace `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Busy` when the write lock stays unavailable for
    /// every attempt of the retry policy.
    pub fn put(&self, key: &str, value: &str, tag: &str) -> Result<()> {
        let encrypted = self.cipher.encrypt(value, key.as_bytes())?;
        let now = chrono::Utc::now().timestamp();
        let conn = self.lock()?;

        self.retry.run(|| {
            conn.execute(
                "INSERT INTO records (key, value, tag, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     tag = excluded.tag,
                     updated_at = excluded.updated_at",
                params![key, encrypted, tag, now],
            )
        })?;

        debug!(key, tag, "record stored");
        Ok(())
    }

    /// Fetch and decrypt `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the row exists but does not decrypt.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let encrypted: Option<String> = {
            let conn = self.lock()?;
            self.retry.run(|| {
                conn.query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()
            })?
        };

        trace!(key, found = encrypted.is_some(), "record lookup");
        encrypted.map(|e| self.decrypt(key, &e)).transpose()
    }

    /// Fetch and decrypt every row carrying `tag`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` on the first row that does not decrypt.
    pub fn get_all(&self, tag: &str) -> Result<BTreeMap<String, String>> {
        let rows = self.rows(tag)?;
        debug!(tag, count = rows.len(), "records listed");
        rows.into_iter()
            .map(|(key, encrypted)| {
                let value = self.decrypt(&key, &encrypted)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Keys carrying `tag`, without decrypting anything.
    pub fn keys(&self, tag: &str) -> Result<Vec<String>> {
        Ok(self.rows(tag)?.into_iter().map(|(key, _)| key).collect())
    }

    /// Whether a row exists for `key`.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        self.retry.run(|| {
            conn.query_row("SELECT 1 FROM records WHERE key = ?1", [key], |_| Ok(()))
                .optional()
                .map(|row| row.is_some())
        })
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        let removed = self
            .retry
            .run(|| conn.execute("DELETE FROM records WHERE key = ?1", [key]))?;
        debug!(key, removed, "record deleted");
        Ok(())
    }

    fn rows(&self, tag: &str) -> Result<Vec<(String, String)>> {
        let conn = self.lock()?;
        self.retry.run(|| {
            let mut stmt =
                conn.prepare_cached("SELECT key, value FROM records WHERE tag = ?1 ORDER BY key")?;
            let rows = stmt.query_map([tag], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
    }

    fn decrypt(&self, key: &str, encrypted: &str) -> Result<String> {
        self.cipher
            .decrypt(encrypted, key.as_bytes())
            .map_err(|_| {
                warn!(key, "record failed to decrypt");
                Error::from(StoreError::Corrupt {
                    key: key.to_string(),
                })
            })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("record store".to_string()).into())
    }
}
