//! Runtime configuration.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables:
//!
//! ```toml
//! secret = "..."                 # or TETHER_SECRET
//! credentials_db = "/var/lib/tether/credentials.db"
//! sessions_db = "/var/lib/tether/sessions.db"
//! token_ttl_secs = 300
//! session_ttl_secs = 3600
//!
//! [store]
//! attempts = 3
//! backoff_ms = 100
//! busy_timeout_ms = 10000
//!
//! [sync]
//! attempts = 4
//! base_delay_ms = 1000
//! max_delay_ms = 10000
//! timeout_secs = 10
//! poll_interval_secs = 86400
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::constants;
use crate::core::store::RetryPolicy;
use crate::core::sync::Backoff;
use crate::error::{ConfigError, Result};

/// Everything needed to open a [`Context`](crate::core::context::Context).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Long-term secret. Signs state tokens and derives the record key.
    #[serde(deserialize_with = "zeroizing")]
    pub secret: Zeroizing<String>,
    pub credentials_db: PathBuf,
    pub sessions_db: PathBuf,
    pub token_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub store: StoreSettings,
    pub sync: SyncSettings,
}

/// Record store write-retry knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
    pub busy_timeout_ms: u64,
}

/// Sync engine and poller knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let dir = default_data_dir();
        Self {
            secret: Zeroizing::new(String::new()),
            credentials_db: dir.join(constants::CREDENTIALS_DB),
            sessions_db: dir.join(constants::SESSIONS_DB),
            token_ttl_secs: constants::STATE_TOKEN_TTL,
            session_ttl_secs: constants::SESSION_TTL,
            store: StoreSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            attempts: constants::STORE_ATTEMPTS,
            backoff_ms: constants::STORE_BACKOFF_MS,
            busy_timeout_ms: constants::STORE_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            attempts: constants::SYNC_ATTEMPTS,
            base_delay_ms: constants::SYNC_BASE_DELAY_MS,
            max_delay_ms: constants::SYNC_MAX_DELAY_MS,
            timeout_secs: constants::SYNC_TIMEOUT_SECS,
            poll_interval_secs: constants::POLL_INTERVAL_SECS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("credentials_db", &self.credentials_db)
            .field("sessions_db", &self.sessions_db)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("store", &self.store)
            .field("sync", &self.sync)
            .finish()
    }
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse` if the file
    /// can't be read, and any `validate` failure.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, with no file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without validating or consulting the environment.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents).map_err(ConfigError::Parse)?)
    }

    /// Apply `TETHER_*` overrides using `lookup` to read variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(constants::SECRET_ENV) {
            debug!("secret taken from environment");
            self.secret = Zeroizing::new(secret);
        }
        if let Some(path) = lookup(constants::CREDENTIALS_DB_ENV) {
            self.credentials_db = PathBuf::from(path);
        }
        if let Some(path) = lookup(constants::SESSIONS_DB_ENV) {
            self.sessions_db = PathBuf::from(path);
        }
    }

    /// Reject settings the rest of the crate can't run with.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingSecret` for an empty secret,
    /// `ConfigError::Invalid` for zero-valued limits or a backoff ceiling
    /// below its base.
    pub fn validate(&self) -> Result<()> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret.into());
        }

        let nonzero = [
            ("token_ttl_secs", self.token_ttl_secs),
            ("session_ttl_secs", self.session_ttl_secs),
            ("store.attempts", u64::from(self.store.attempts)),
            ("sync.attempts", u64::from(self.sync.attempts)),
            ("sync.base_delay_ms", self.sync.base_delay_ms),
            ("sync.timeout_secs", self.sync.timeout_secs),
            ("sync.poll_interval_secs", self.sync.poll_interval_secs),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{field} must be greater than zero")).into());
        }

        if self.sync.max_delay_ms < self.sync.base_delay_ms {
            return Err(ConfigError::Invalid(
                "sync.max_delay_ms must not be below sync.base_delay_ms".into(),
            )
            .into());
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.store.attempts,
            backoff: Duration::from_millis(self.store.backoff_ms),
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            attempts: self.sync.attempts,
            base_delay: Duration::from_millis(self.sync.base_delay_ms),
            max_delay: Duration::from_millis(self.sync.max_delay_ms),
        }
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::DATA_DIR)
}

fn zeroizing<'de, D>(deserializer: D) -> std::result::Result<Zeroizing<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Zeroizing::new)
}
