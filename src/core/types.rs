//! Domain types.
//!
//! Newtypes for the identifiers that flow between the stores and the sync
//! engine, so a platform name can't be passed where an entity id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A cross-platform user identity.
///
/// `Debug` shows only the first eight hex digits so identities don't end up in
/// logs wholesale. `Display` gives the full hyphenated form and is meant for
/// internal object paths and token payloads only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Mint a new random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for IdentityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for IdentityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "IdentityId({}…)", &simple[..8])
    }
}

/// A third-party platform name, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    /// Create a platform name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPlatform` unless the name is
    /// non-empty ASCII alphanumerics starting with a letter.
    pub fn new(name: &str) -> std::result::Result<Self, ValidationError> {
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(ValidationError::InvalidPlatform(name.to_string()));
        }
        Ok(Self(name.to_ascii_uppercase()))
    }

    /// Upper-case form used inside record keys.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in object paths.
    pub fn slug(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Platform {
    type Error = ValidationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.0
    }
}

/// A platform-side entity id (shop domain, page id, ...), kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyEntityId` for an empty id.
    pub fn new(id: impl Into<String>) -> std::result::Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyEntityId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a credential row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// A platform access token or similar secret.
    Secret,
    /// The identity an entity belongs to.
    IdentityLink,
}

impl CredentialKind {
    /// Store tag for rows of this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::IdentityLink => "identity_link",
        }
    }

    /// Marker segment inside record keys.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Secret => "TOKEN",
            Self::IdentityLink => "UUID",
        }
    }
}

impl FromStr for CredentialKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "secret" => Ok(Self::Secret),
            "identity_link" => Ok(Self::IdentityLink),
            other => Err(ValidationError::InvalidKey {
                key: other.to_string(),
                reason: "unknown credential kind".to_string(),
            }),
        }
    }
}
