//! Collaborators the sync engine talks to.
//!
//! The platform client ([`Fetcher`]) and the mirror's object storage
//! ([`ObjectStore`]) live outside this crate; these traits are the whole of
//! what the engine needs from them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::types::{EntityId, Platform};
use crate::core::vault::Credential;

/// Why a platform fetch failed.
///
/// Only `RateLimited` is retried; anything else ends the attempt at once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("rate limited")]
    RateLimited,

    #[error("{0}")]
    Failed(String),
}

/// Why an object-store call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// Nothing stored at the path yet.
    #[error("object not found")]
    NotFound,

    #[error("{0}")]
    Transport(String),
}

/// Access control for uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    Private,
}

/// Fetches the current snapshot of an entity's data from its platform.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, credential: &Credential) -> Result<Value, FetchError>;
}

/// Remote object storage holding the mirror.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectError>;

    async fn put(&self, path: &str, bytes: Vec<u8>, acl: Acl) -> Result<(), ObjectError>;
}

/// A change notification whose signature the caller has already verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub platform: Platform,
    pub entity_id: EntityId,
    /// Platform topic or event name, for logs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}
