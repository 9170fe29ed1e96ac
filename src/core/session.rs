//! Session linking.
//!
//! A session is a short-lived pointer from a client-held reference (a cookie)
//! to an [`IdentityId`]. It carries the identity across authorization flows
//! on different platforms, in whatever order the user completes them.
//!
//! Per reference the lifecycle is `Absent -> Valid -> {Consumed, Expired}`.
//! Every successful touch rotates the reference: the old row is deleted and
//! the identity is reissued under a fresh one, which bounds how long a leaked
//! reference stays useful.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::constants::{SESSION_TAG, SESSION_TTL};
use crate::core::store::RecordStore;
use crate::core::types::IdentityId;
use crate::error::{Error, Result, SessionError, StoreError};

const REF_LEN: usize = 32;

/// Stored form of a session row (encrypted by the record store).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    identity: IdentityId,
    created_at: i64,
}

/// Creates, rotates and verifies sessions.
pub struct SessionLinker {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    ttl: u64,
}

impl std::fmt::Debug for SessionLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLinker")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionLinker {
    /// Create a linker over a dedicated sessions store.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), SESSION_TTL)
    }

    /// Create a linker with an explicit clock and inactivity limit (seconds).
    pub fn with_clock(store: Arc<RecordStore>, clock: Arc<dyn Clock>, ttl: u64) -> Self {
        Self { store, clock, ttl }
    }

    /// Resolve or mint the identity behind `session_ref`, rotating the reference.
    ///
    /// A live session keeps its identity and is reissued under a new
    /// reference. A missing, unknown or expired reference gets a brand new
    /// identity.
    ///
    /// # Returns
    ///
    /// The new session reference and the identity it points to.
    pub fn get_or_create(&self, session_ref: Option<&str>) -> Result<(String, IdentityId)> {
        let existing = match session_ref {
            Some(r) => self.resolve(r)?.map(|identity| (r, identity)),
            None => None,
        };

        let identity = match existing {
            Some((old_ref, identity)) => {
                self.store.delete(old_ref)?;
                debug!(?identity, "session rotated");
                identity
            }
            None => {
                let identity = IdentityId::new();
                info!(?identity, "identity created");
                identity
            }
        };

        let new_ref = self.issue(identity)?;
        Ok((new_ref, identity))
    }

    /// Check that `session_ref` is live and, optionally, that it points at
    /// `expected`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Missing` if no reference was supplied
    /// - `SessionError::Invalid` if it does not resolve or has expired
    /// - `SessionError::IdentityMismatch` if it resolves to another identity
    pub fn verify(
        &self,
        session_ref: Option<&str>,
        expected: Option<&IdentityId>,
    ) -> Result<IdentityId> {
        let session_ref = session_ref
            .filter(|r| !r.is_empty())
            .ok_or(SessionError::Missing)?;
        let identity = self.resolve(session_ref)?.ok_or(SessionError::Invalid)?;

        if let Some(expected) = expected {
            if *expected != identity {
                warn!("session identity mismatch");
                return Err(SessionError::IdentityMismatch.into());
            }
        }
        Ok(identity)
    }

    /// Delete a session once its hand-off has been consumed.
    pub fn clear(&self, session_ref: &str) -> Result<()> {
        self.store.delete(session_ref)
    }

    /// Delete every session older than the inactivity limit.
    ///
    /// Rows that no longer decrypt are left alone and logged, so a rotated
    /// secret shows up in the logs instead of silently emptying the table.
    ///
    /// # Returns
    ///
    /// Number of sessions removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for session_ref in self.store.keys(SESSION_TAG)? {
            match self.load(&session_ref) {
                Ok(Some(record)) if self.is_expired(&record) => {
                    self.store.delete(&session_ref)?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable session"),
            }
        }
        if removed > 0 {
            info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }

    /// Live identity for a reference. Expired rows are deleted on sight.
    fn resolve(&self, session_ref: &str) -> Result<Option<IdentityId>> {
        let Some(record) = self.load(session_ref)? else {
            return Ok(None);
        };
        if self.is_expired(&record) {
            debug!("session expired");
            self.store.delete(session_ref)?;
            return Ok(None);
        }
        Ok(Some(record.identity))
    }

    fn load(&self, session_ref: &str) -> Result<Option<SessionRecord>> {
        self.store
            .get(session_ref)?
            .map(|json| {
                serde_json::from_str::<SessionRecord>(&json)
                    .map_err(|e| Error::from(StoreError::Encode(e)))
            })
            .transpose()
    }

    fn issue(&self, identity: IdentityId) -> Result<String> {
        let session_ref = generate_ref();
        let record = SessionRecord {
            identity,
            created_at: self.clock.now(),
        };
        let json = serde_json::to_string(&record).map_err(StoreError::Encode)?;
        self.store.put(&session_ref, &json, SESSION_TAG)?;
        Ok(session_ref)
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        self.clock.now().abs_diff(record.created_at) > self.ttl
    }
}

fn generate_ref() -> String {
    let mut bytes = [0u8; REF_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
