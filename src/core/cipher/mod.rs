//! Record encryption.
//!
//! Provides key derivation from the long-term secret and the authenticated
//! cipher used for every stored value.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `Cipher` trait
//! 2. Add the implementation in a new file
//! 3. Re-export from this module

use crate::error::Result;

mod aes;
mod kdf;

pub use aes::Aes256;
pub use kdf::{derive_key, MasterKey};

/// Authenticated encryption backend.
///
/// `context` is bound to the ciphertext as associated data; decrypting with a
/// different context fails. The record store passes the record key, so a
/// value copied onto another key is rejected.
pub trait Cipher: Send + Sync {
    /// Encrypt a plaintext string.
    ///
    /// # Returns
    ///
    /// Text-safe ciphertext (format depends on backend implementation).
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` if encryption fails.
    fn encrypt(&self, plaintext: &str, context: &[u8]) -> Result<String>;

    /// Decrypt a string produced by [`Cipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` on a wrong key, wrong context,
    /// or tampered ciphertext.
    fn decrypt(&self, encrypted: &str, context: &[u8]) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
