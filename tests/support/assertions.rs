//! Test assertion helpers.

use tether::core::sync::{SyncRecord, SyncStatus};

/// Assert a record ended in `status`, showing the detail on failure.
pub fn assert_status(record: &SyncRecord, status: SyncStatus) {
    assert_eq!(
        record.status, status,
        "entity {} ended as {:?} (detail: {:?})",
        record.entity_id, record.status, record.detail
    );
}

/// Statuses of a batch, in order.
pub fn statuses(records: &[SyncRecord]) -> Vec<SyncStatus> {
    records.iter().map(|r| r.status).collect()
}
