//! Tether - credential vault, cross-platform identity linking and data
//! mirroring for multi-platform integrations.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── core/             # Core library components
//! │   ├── codec         # Signed, expiring state tokens
//! │   ├── cipher/       # Record encryption
//! │   │   ├── mod       # Cipher trait
//! │   │   ├── kdf       # PBKDF2 key derivation
//! │   │   └── aes       # AES-256-GCM implementation
//! │   ├── store/        # Encrypted SQLite record store
//! │   │   ├── mod       # RecordStore
//! │   │   └── retry     # Busy-lock retry policy
//! │   ├── session       # Session references -> identities
//! │   ├── handoff       # Authorization begin/complete
//! │   ├── vault         # Platform secrets and identity links
//! │   ├── sync/         # Fetch, fingerprint, upload-if-changed
//! │   ├── config        # TOML + environment configuration
//! │   └── context       # Component wiring
//! ├── logging           # tracing subscriber setup
//! └── error             # Error types
//! ```
//!
//! # Features
//!
//! - Encrypted-at-rest key/value records shared safely across processes
//! - One identity across platforms, whatever order they are authorized in
//! - Idempotent mirroring driven by both webhooks and polling

pub mod core;
pub mod error;
pub mod logging;

pub use crate::core::config::Config;
pub use crate::core::context::Context;
pub use crate::core::types::{CredentialKind, EntityId, IdentityId, Platform};
pub use crate::error::{Error, Result};
