//! Constants used throughout tether.
//!
//! Centralizes magic strings and tuning defaults.

/// Environment variable holding the long-term secret.
pub const SECRET_ENV: &str = "TETHER_SECRET";

/// Environment variable overriding the credentials database path.
pub const CREDENTIALS_DB_ENV: &str = "TETHER_CREDENTIALS_DB";

/// Environment variable overriding the sessions database path.
pub const SESSIONS_DB_ENV: &str = "TETHER_SESSIONS_DB";

/// Environment variable read by the log filter.
pub const LOG_ENV: &str = "TETHER_LOG";

/// Directory name under the platform data dir.
pub const DATA_DIR: &str = "tether";

/// Default credentials database file name.
pub const CREDENTIALS_DB: &str = "credentials.db";

/// Default sessions database file name.
pub const SESSIONS_DB: &str = "sessions.db";

/// Fixed PBKDF2 salt.
///
/// The key must be reproducible in every worker process from the secret
/// alone, so the salt cannot be random. Changing it invalidates every row.
pub const KDF_SALT: &[u8] = b"tether.record-store.v1";

/// PBKDF2-HMAC-SHA256 iteration count.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Maximum age of a state token, in seconds.
pub const STATE_TOKEN_TTL: u64 = 300;

/// Session inactivity limit, in seconds.
pub const SESSION_TTL: u64 = 3600;

/// Record-store tag for session rows.
pub const SESSION_TAG: &str = "session";

/// Write attempts before a busy store gives up.
pub const STORE_ATTEMPTS: u32 = 3;

/// Sleep between busy retries, in milliseconds.
pub const STORE_BACKOFF_MS: u64 = 100;

/// SQLite busy timeout per statement, in milliseconds.
pub const STORE_BUSY_TIMEOUT_MS: u64 = 10_000;

/// Fetch attempts for rate-limited platform calls.
pub const SYNC_ATTEMPTS: u32 = 4;

/// First backoff delay after a rate-limited fetch, in milliseconds.
pub const SYNC_BASE_DELAY_MS: u64 = 1_000;

/// Backoff ceiling, in milliseconds.
pub const SYNC_MAX_DELAY_MS: u64 = 10_000;

/// Timeout applied to every collaborator call, in seconds.
pub const SYNC_TIMEOUT_SECS: u64 = 10;

/// Default poll period, in seconds (daily).
pub const POLL_INTERVAL_SECS: u64 = 86_400;
