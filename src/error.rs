//! Error types.
//!
//! One top-level [`Error`] wraps a sub-enum per concern so callers can match
//! on the failure class (`Error::Session(SessionError::Missing)`) while `?`
//! converts freely inside the crate.
//!
//! No variant carries secret material: record values, token signatures and
//! credentials never appear in a message.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// State token failures. All of them reject the enclosing request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed state token")]
    Malformed,

    #[error("expired state token")]
    Expired,

    #[error("invalid state token signature")]
    Forged,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store busy: write lock not acquired after {attempts} attempts")]
    Busy { attempts: u32 },

    /// The row exists but cannot be decrypted. Usually means the long-term
    /// secret changed since the row was written.
    #[error("record '{key}' cannot be decrypted (was the secret rotated?)")]
    Corrupt { key: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("record encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing session reference")]
    Missing,

    #[error("invalid or expired session")]
    Invalid,

    #[error("session identity does not match the state token")]
    IdentityMismatch,
}

/// Per-entity sync failures. These are recorded into sync results rather than
/// raised to batch callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
}

#[derive(Error, Debug)]
pub enum CipherError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no secret configured: set TETHER_SECRET or `secret` in the config file")]
    MissingSecret,

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("key cannot be empty")]
    EmptyKey,

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid platform name '{0}': only ASCII letters and digits are allowed")]
    InvalidPlatform(String),

    #[error("entity id cannot be empty")]
    EmptyEntityId,

    #[error("cannot decode entity id from '{0}'")]
    InvalidEncoding(String),

    #[error("token payload cannot contain ':'")]
    InvalidPayload,
}
