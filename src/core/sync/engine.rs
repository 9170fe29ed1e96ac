//! Per-platform sync engine.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::fingerprint::{canonical_json, fingerprint_bytes};
use super::record::{SyncRecord, SyncStatus};
use super::remote::{Acl, FetchError, Fetcher, Notification, ObjectError, ObjectStore};
use crate::core::constants::SYNC_TIMEOUT_SECS;
use crate::core::types::{CredentialKind, EntityId, IdentityId, Platform};
use crate::core::validation::encode_entity;
use crate::core::vault::{Credential, CredentialVault};
use crate::error::{Error, Result, SyncError};

/// Maps an entity to its destination path in the object store.
pub type PathBuilder = Arc<dyn Fn(&IdentityId, &Platform, &EntityId) -> String + Send + Sync>;

type Step<T> = std::result::Result<T, SyncError>;

/// `users/{identity}/{platform}/{encoded_entity}/data.json`
pub fn default_path(identity: &IdentityId, platform: &Platform, entity: &EntityId) -> String {
    format!(
        "users/{}/{}/{}/data.json",
        identity,
        platform.slug(),
        encode_entity(entity)
    )
}

/// Mirrors one platform's entity data into the object store.
///
/// Uploads happen only when the canonical fingerprint of freshly fetched data
/// differs from what is already at the destination, so event and poll
/// triggers can overlap freely.
pub struct SyncEngine {
    platform: Platform,
    vault: CredentialVault,
    fetcher: Arc<dyn Fetcher>,
    objects: Arc<dyn ObjectStore>,
    path: PathBuilder,
    backoff: Backoff,
    timeout: Duration,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("platform", &self.platform)
            .field("backoff", &self.backoff)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        platform: Platform,
        vault: CredentialVault,
        fetcher: Arc<dyn Fetcher>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            platform,
            vault,
            fetcher,
            objects,
            path: Arc::new(default_path),
            backoff: Backoff::default(),
            timeout: Duration::from_secs(SYNC_TIMEOUT_SECS),
        }
    }

    /// Use a custom destination layout.
    pub fn with_path<F>(mut self, path: F) -> Self
    where
        F: Fn(&IdentityId, &Platform, &EntityId) -> String + Send + Sync + 'static,
    {
        self.path = Arc::new(path);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Bound on every single fetcher or object-store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Whether `document` differs from what is stored at `path`.
    ///
    /// Missing or unparseable destination content counts as changed.
    ///
    /// # Errors
    ///
    /// `SyncError::UploadFailed` if the destination can't be read. A failed
    /// read is never treated as "changed".
    pub async fn changed(&self, document: &Value, path: &str) -> Result<bool> {
        let current = fingerprint_bytes(canonical_json(document).as_bytes());
        let previous = self.remote_fingerprint(path).await?;
        Ok(previous.as_deref() != Some(current.as_str()))
    }

    /// Write the canonical serialization of `document` to `path`, privately.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    pub async fn upload(&self, document: &Value, path: &str) -> Result<usize> {
        Ok(self.write(canonical_json(document), path).await?)
    }

    /// Handle a verified change notification for one entity.
    pub async fn on_event(&self, notification: &Notification) -> SyncRecord {
        let entity_id = notification.entity_id.clone();
        if notification.platform != self.platform {
            warn!(
                platform = %notification.platform,
                expected = %self.platform,
                "notification for another platform"
            );
            return SyncRecord::skipped(entity_id, "platform mismatch");
        }
        debug!(
            platform = %self.platform,
            entity = %entity_id,
            topic = notification.topic.as_deref().unwrap_or("-"),
            "change notification"
        );

        self.sync_entity(entity_id).await
    }

    /// Sync every entity of the platform with a stored secret.
    ///
    /// Per-entity failures end up in the returned records, including a
    /// secret that no longer decrypts; only a failure to list the entities is
    /// an error.
    pub async fn poll(&self) -> Result<Vec<SyncRecord>> {
        let started = Instant::now();
        let platform = self.platform.clone();
        let entities = self
            .lookup(move |vault| vault.entity_ids(&platform, CredentialKind::Secret))
            .await?;

        let mut records = Vec::with_capacity(entities.len());
        for entity_id in entities {
            records.push(self.sync_entity(entity_id).await);
        }

        let failed = records.iter().filter(|r| r.is_failure()).count();
        info!(
            platform = %self.platform,
            total = records.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "poll finished"
        );
        Ok(records)
    }

    /// Look up the entity's secret and identity link, then run one attempt.
    async fn sync_entity(&self, entity_id: EntityId) -> SyncRecord {
        let platform = self.platform.clone();
        let entity = entity_id.clone();
        let found = self
            .lookup(move |vault| {
                let Some(credential) = vault.get_credential(&platform, &entity)? else {
                    return Ok(None);
                };
                let identity = vault.get_identity_link(&platform, &entity)?;
                Ok(Some((credential, identity)))
            })
            .await;

        match found {
            Ok(Some((credential, Some(identity)))) => self.attempt(&credential, &identity).await,
            Ok(Some((_, None))) => {
                info!(platform = %self.platform, entity = %entity_id, "no identity link; skipping");
                SyncRecord::skipped(entity_id, "no identity link")
            }
            Ok(None) => {
                info!(platform = %self.platform, entity = %entity_id, "no credential; skipping");
                SyncRecord::skipped(entity_id, "no credential")
            }
            Err(e) => self.lookup_failed(entity_id, e),
        }
    }

    /// Run a vault read on the blocking pool; store calls may sleep on a
    /// locked database.
    async fn lookup<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&CredentialVault) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let vault = self.vault.clone();
        tokio::task::spawn_blocking(move || op(&vault))
            .await
            .map_err(|e| SyncError::FetchFailed(format!("credential lookup task: {e}")))?
    }

    async fn attempt(&self, credential: &Credential, identity: &IdentityId) -> SyncRecord {
        let started = Instant::now();
        let entity_id = credential.entity_id.clone();

        let mut record = match self.run(credential, identity).await {
            Ok(record) => record,
            Err(e) => {
                warn!(platform = %self.platform, entity = %entity_id, error = %e, "sync failed");
                SyncRecord::failed(entity_id, &e)
            }
        };
        record.elapsed_ms = started.elapsed().as_millis() as u64;
        record
    }

    async fn run(&self, credential: &Credential, identity: &IdentityId) -> Step<SyncRecord> {
        let entity_id = credential.entity_id.clone();
        let document = self.fetch_with_retry(credential).await?;

        let canonical = canonical_json(&document);
        let fingerprint = fingerprint_bytes(canonical.as_bytes());
        let path = (self.path)(identity, &self.platform, &entity_id);
        let previous = self.remote_fingerprint(&path).await?;

        if previous.as_deref() == Some(fingerprint.as_str()) {
            debug!(platform = %self.platform, entity = %entity_id, "unchanged");
            return Ok(SyncRecord {
                fingerprint: Some(fingerprint),
                previous_fingerprint: previous,
                ..SyncRecord::new(entity_id, SyncStatus::Unchanged)
            });
        }

        let bytes = self.write(canonical, &path).await?;
        info!(platform = %self.platform, entity = %entity_id, bytes, "uploaded");
        Ok(SyncRecord {
            fingerprint: Some(fingerprint),
            previous_fingerprint: previous,
            bytes: Some(bytes),
            ..SyncRecord::new(entity_id, SyncStatus::Uploaded)
        })
    }

    /// Fetch, retrying only while rate limited.
    async fn fetch_with_retry(&self, credential: &Credential) -> Step<Value> {
        let mut delays = self.backoff.delays();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let outcome = self
                .bounded(self.fetcher.fetch(credential))
                .await
                .map_err(SyncError::FetchFailed)?;

            match outcome {
                Ok(document) => return Ok(document),
                Err(FetchError::Failed(reason)) => return Err(SyncError::FetchFailed(reason)),
                Err(FetchError::RateLimited) => match delays.next() {
                    Some(delay) => {
                        warn!(
                            platform = %self.platform,
                            entity = %credential.entity_id,
                            attempt = attempts,
                            delay_ms = delay.as_millis() as u64,
                            "rate limited; backing off"
                        );
                        sleep(delay).await;
                    }
                    None => return Err(SyncError::RateLimited { attempts }),
                },
            }
        }
    }

    /// Fingerprint of the document at `path`, or `None` when there is nothing
    /// usable there.
    async fn remote_fingerprint(&self, path: &str) -> Step<Option<String>> {
        let outcome = self
            .bounded(self.objects.get(path))
            .await
            .map_err(SyncError::UploadFailed)?;

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(ObjectError::NotFound) => return Ok(None),
            Err(ObjectError::Transport(reason)) => {
                warn!(path, reason = %reason, "destination read failed");
                return Err(SyncError::UploadFailed(format!("read: {reason}")));
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(existing) => Ok(Some(fingerprint_bytes(
                canonical_json(&existing).as_bytes(),
            ))),
            Err(e) => {
                warn!(path, error = %e, "destination holds unparseable content; replacing");
                Ok(None)
            }
        }
    }

    async fn write(&self, canonical: String, path: &str) -> Step<usize> {
        let bytes = canonical.into_bytes();
        let len = bytes.len();
        self.bounded(self.objects.put(path, bytes, Acl::Private))
            .await
            .map_err(SyncError::UploadFailed)?
            .map_err(|e| {
                warn!(path, error = %e, "destination write failed");
                SyncError::UploadFailed(format!("write: {e}"))
            })?;
        Ok(len)
    }

    /// Run a collaborator call under the engine's timeout.
    async fn bounded<T>(&self, call: impl Future<Output = T>) -> std::result::Result<T, String> {
        timeout(self.timeout, call)
            .await
            .map_err(|_| format!("timed out after {}ms", self.timeout.as_millis()))
    }

    /// Stored rows are named by record key only, never by value.
    fn lookup_failed(&self, entity_id: EntityId, error: Error) -> SyncRecord {
        warn!(platform = %self.platform, entity = %entity_id, error = %error, "credential lookup failed");
        SyncRecord::failed(
            entity_id,
            &SyncError::FetchFailed(format!("credential lookup: {error}")),
        )
    }
}
