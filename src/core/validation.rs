//! Record key grammar.
//!
//! Record keys must be environment-variable-style names:
//! - Only A-Z, a-z, 0-9, and underscore
//! - Cannot start with a digit
//! - Cannot be empty
//!
//! Entity ids come from third parties and can contain anything (dots in shop
//! domains, unicode, ...), so they go through a reversible encoding before
//! they become part of a key:
//!
//! - ASCII letters and digits pass through unchanged
//! - every other byte of the UTF-8 encoding, `_` included, becomes `_XX`
//!   with two upper-case hex digits
//!
//! Because `_` is always escaped inside the entity segment, decoding is
//! unambiguous: `shop.myshopify.com` <-> `shop_2Emyshopify_2Ecom`.

use crate::core::types::{CredentialKind, EntityId, Platform};
use crate::error::{Result, ValidationError};

/// Validate a record key name.
///
/// # Errors
///
/// Returns `ValidationError` if the key is invalid.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey.into());
    }

    if let Some(first_char) = key.chars().next() {
        if first_char.is_ascii_digit() {
            return Err(ValidationError::InvalidKey {
                key: key.to_string(),
                reason: "cannot start with a digit".to_string(),
            }
            .into());
        }
    }

    for (i, ch) in key.chars().enumerate() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(ValidationError::InvalidKey {
                key: key.to_string(),
                reason: format!(
                    "invalid character '{}' at position {}. Only letters, digits, and underscore are allowed",
                    ch,
                    i + 1
                ),
            }
            .into());
        }
    }

    Ok(())
}

/// Encode an entity id into the key-safe alphabet.
pub fn encode_entity(entity: &EntityId) -> String {
    let raw = entity.as_str();
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(byte as char);
        } else {
            out.push('_');
            out.push_str(&format!("{:02X}", byte));
        }
    }
    out
}

/// Reverse [`encode_entity`].
///
/// # Errors
///
/// Returns `ValidationError::InvalidEncoding` on a truncated or non-hex
/// escape, an escape the encoder would never write (lower-case hex, or an
/// escaped letter or digit), a stray character, or bytes that are not UTF-8.
pub fn decode_entity(encoded: &str) -> Result<EntityId> {
    let invalid = || ValidationError::InvalidEncoding(encoded.to_string());

    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                let hex = bytes.get(i + 1..i + 3).ok_or_else(invalid)?;
                let hex = std::str::from_utf8(hex).map_err(|_| invalid())?;
                // Only the exact form the encoder writes: upper-case hex, and
                // never for a byte that would have passed through unescaped.
                if !hex.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
                    return Err(invalid().into());
                }
                let byte = u8::from_str_radix(hex, 16).map_err(|_| invalid())?;
                if byte.is_ascii_alphanumeric() {
                    return Err(invalid().into());
                }
                out.push(byte);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() => {
                out.push(b);
                i += 1;
            }
            _ => return Err(invalid().into()),
        }
    }

    let decoded = String::from_utf8(out).map_err(|_| invalid())?;
    Ok(EntityId::new(decoded)?)
}

/// Build the record key for a credential row.
///
/// Layout: `{PLATFORM}_{MARKER}_{encoded entity}`, e.g. `SHOPIFY_TOKEN_shop_2Ecom`.
pub fn credential_key(platform: &Platform, kind: CredentialKind, entity: &EntityId) -> String {
    format!(
        "{}_{}_{}",
        platform.as_str(),
        kind.marker(),
        encode_entity(entity)
    )
}

/// Parse a credential key back into its entity id, if it belongs to
/// `platform` and `kind`.
pub fn parse_credential_key(
    key: &str,
    platform: &Platform,
    kind: CredentialKind,
) -> Option<EntityId> {
    let prefix = format!("{}_{}_", platform.as_str(), kind.marker());
    let encoded = key.strip_prefix(&prefix)?;
    decode_entity(encoded).ok()
}
