//! Idempotent mirroring of platform data into object storage.
//!
//! Two triggers feed the same [`SyncEngine`]:
//!
//! - [`SyncEngine::on_event`]: a verified change notification for one entity
//! - [`SyncEngine::poll`]: a periodic sweep over every entity with a stored
//!   secret, usually driven by a [`Poller`]
//!
//! Each attempt fetches a fresh snapshot, fingerprints its canonical JSON and
//! uploads only if the destination holds something different. Overlapping
//! triggers therefore converge on one copy without coordination.

mod backoff;
mod engine;
mod fingerprint;
mod poller;
mod record;
mod remote;

pub use backoff::Backoff;
pub use engine::{default_path, PathBuilder, SyncEngine};
pub use fingerprint::{canonical_json, fingerprint};
pub use poller::{PollStats, Poller, PollerHandle};
pub use record::{SyncRecord, SyncStatus};
pub use remote::{Acl, FetchError, Fetcher, Notification, ObjectError, ObjectStore};
