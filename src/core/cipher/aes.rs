//! AES-256-GCM record cipher.
//!
//! - 256-bit key from [`derive_key`](super::derive_key)
//! - 96-bit (12 byte) random nonce per value
//! - 128-bit authentication tag
//!
//! Ciphertext format: base64url(nonce || ciphertext+tag), no padding.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::trace;

use super::{Cipher, MasterKey};
use crate::error::{CipherError, Result};

const NONCE_LEN: usize = 12;

/// AES-256-GCM backend.
pub struct Aes256 {
    cipher: Aes256Gcm,
}

impl Aes256 {
    pub fn new(key: &MasterKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }
}

impl Cipher for Aes256 {
    fn encrypt(&self, plaintext: &str, context: &[u8]) -> Result<String> {
        trace!(plaintext_len = plaintext.len(), "encrypting record");

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: context,
                },
            )
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    fn decrypt(&self, encrypted: &str, context: &[u8]) -> Result<String> {
        let data = URL_SAFE_NO_PAD
            .decode(encrypted)
            .map_err(|_| CipherError::DecryptionFailed)?;
        if data.len() < NONCE_LEN {
            return Err(CipherError::DecryptionFailed.into());
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: context,
                },
            )
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed.into())
    }

    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }
}
