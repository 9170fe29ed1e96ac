//! PBKDF2 key derivation for the record-store key.
//!
//! Uses PBKDF2-HMAC-SHA256 with:
//! - Fixed salt (`constants::KDF_SALT`)
//! - 100,000 iterations
//! - Output length: 32 bytes (256 bits)
//!
//! Every worker process must arrive at the same key from the same secret, so
//! the derivation is deterministic. Changing the secret, salt or iteration
//! count makes every existing row undecryptable.

use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroize;

use crate::core::constants::{KDF_ITERATIONS, KDF_SALT};
use crate::error::{CipherError, Result};

/// A 256-bit key derived from the long-term secret. Zeroized on drop.
#[derive(Clone)]
pub struct MasterKey {
    key: [u8; 32],
}

impl MasterKey {
    /// Create a key from raw bytes (use with caution)
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the record-store key from the long-term secret.
///
/// Deliberately slow; call once per process and share the result.
///
/// # Errors
///
/// Returns `CipherError::KeyDerivation` for an empty secret.
pub fn derive_key(secret: &[u8]) -> Result<MasterKey> {
    if secret.is_empty() {
        return Err(CipherError::KeyDerivation("secret is empty".to_string()).into());
    }

    debug!(iterations = KDF_ITERATIONS, "deriving record key");
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, KDF_SALT, KDF_ITERATIONS, &mut key);
    Ok(MasterKey { key })
}
