//! Per-entity sync outcomes.

use serde::Serialize;

use crate::core::types::EntityId;
use crate::error::SyncError;

/// How one entity's sync attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Remote copy already matched; nothing written.
    Unchanged,
    /// New content written.
    Uploaded,
    /// Platform fetch failed (after retries, if rate limited).
    FetchFailed,
    /// Destination read or write failed.
    UploadFailed,
    /// No credential or identity link for the entity.
    Skipped,
}

/// Result of one entity's sync attempt. Never carries the identity or the
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRecord {
    pub entity_id: EntityId,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Fingerprint of the fetched document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Fingerprint of what was at the destination before, if anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_fingerprint: Option<String>,
    /// Bytes written, for uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    pub elapsed_ms: u64,
}

impl SyncRecord {
    pub(crate) fn new(entity_id: EntityId, status: SyncStatus) -> Self {
        Self {
            entity_id,
            status,
            detail: None,
            fingerprint: None,
            previous_fingerprint: None,
            bytes: None,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn skipped(entity_id: EntityId, detail: &str) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(entity_id, SyncStatus::Skipped)
        }
    }

    pub(crate) fn failed(entity_id: EntityId, error: &SyncError) -> Self {
        let status = match error {
            SyncError::UploadFailed(_) => SyncStatus::UploadFailed,
            SyncError::FetchFailed(_) | SyncError::RateLimited { .. } => SyncStatus::FetchFailed,
        };
        Self {
            detail: Some(error.to_string()),
            ..Self::new(entity_id, status)
        }
    }

    /// Whether the attempt ended in a failure state.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            SyncStatus::FetchFailed | SyncStatus::UploadFailed
        )
    }
}
