//! Signed state tokens.
//!
//! A state token rides an authorization redirect and comes back on the
//! callback. It proves the callback belongs to a flow this backend started
//! (CSRF) and carries a small payload, usually the identity being linked.
//!
//! ## Wire format
//!
//! ```text
//! issued_at:nonce:signature
//! issued_at:nonce:payload:signature
//! ```
//!
//! `issued_at` is unix seconds, `nonce` is 8 random bytes and `signature` is
//! HMAC-SHA256 over everything before the last colon, both base64url without
//! padding.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::core::clock::{Clock, SystemClock};
use crate::error::{Result, TokenError, ValidationError};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 8;

/// Issues and validates state tokens.
#[derive(Clone)]
pub struct SecretCodec {
    key: Zeroizing<Vec<u8>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec").finish_non_exhaustive()
    }
}

impl SecretCodec {
    /// Create a codec signing with `secret` and the system clock.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Create a codec with an explicit time source.
    pub fn with_clock(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            key: Zeroizing::new(secret.to_vec()),
            clock,
        }
    }

    /// Issue a token carrying an optional payload.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPayload` if the payload contains `:`.
    pub fn generate(&self, payload: Option<&str>) -> Result<String> {
        if payload.is_some_and(|p| p.contains(':')) {
            return Err(ValidationError::InvalidPayload.into());
        }

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut body = format!("{}:{}", self.clock.now(), URL_SAFE_NO_PAD.encode(nonce));
        if let Some(payload) = payload {
            body.push(':');
            body.push_str(payload);
        }

        let signature = URL_SAFE_NO_PAD.encode(self.mac(&body).finalize().into_bytes());
        debug!(has_payload = payload.is_some(), "state token issued");
        Ok(format!("{}:{}", body, signature))
    }

    /// Validate a token and return its payload.
    ///
    /// # Errors
    ///
    /// - `TokenError::Malformed` on a wrong field count or bad timestamp
    /// - `TokenError::Expired` if `|now - issued_at| > max_age`
    /// - `TokenError::Forged` if the signature does not match
    pub fn validate(&self, token: &str, max_age: u64) -> Result<Option<String>> {
        let parts: Vec<&str> = token.split(':').collect();
        let (issued_at, payload) = match parts.as_slice() {
            [issued_at, _nonce, _sig] => (*issued_at, None),
            [issued_at, _nonce, payload, _sig] => (*issued_at, Some(*payload)),
            _ => {
                warn!(fields = parts.len(), "malformed state token");
                return Err(TokenError::Malformed.into());
            }
        };
        let issued_at: i64 = issued_at.parse().map_err(|_| TokenError::Malformed)?;

        let age = self.clock.now().abs_diff(issued_at);
        if age > max_age {
            warn!(age, max_age, "expired state token");
            return Err(TokenError::Expired.into());
        }

        // Everything before the final colon is the signed body.
        let (body, signature) = token.rsplit_once(':').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Forged)?;
        self.mac(body).verify_slice(&signature).map_err(|_| {
            warn!("state token signature mismatch");
            TokenError::Forged
        })?;

        Ok(payload.map(str::to_string))
    }

    fn mac(&self, body: &str) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
        mac.update(body.as_bytes());
        mac
    }
}
