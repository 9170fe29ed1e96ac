//! Credential vault.
//!
//! Typed facade over the credentials [`RecordStore`]. Two kinds of rows live
//! here, keyed by platform and entity:
//!
//! - `{PLATFORM}_TOKEN_{entity}` (tag `secret`): the platform access token
//! - `{PLATFORM}_UUID_{entity}` (tag `identity_link`): the identity the
//!   entity belongs to
//!
//! See [`validation`](crate::core::validation) for how entity ids are encoded
//! into keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::store::RecordStore;
use crate::core::types::{CredentialKind, EntityId, IdentityId, Platform};
use crate::core::validation::{credential_key, parse_credential_key, validate_key};
use crate::error::{Result, StoreError};

/// A stored credential, ready to hand to a platform client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub platform: Platform,
    pub entity_id: EntityId,
    pub secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("platform", &self.platform)
            .field("entity_id", &self.entity_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Platform secrets and identity links.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    store: Arc<RecordStore>,
}

impl CredentialVault {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Store (or replace) the secret for an entity.
    pub fn store_credential(
        &self,
        platform: &Platform,
        entity_id: &EntityId,
        secret: &str,
    ) -> Result<()> {
        self.put(platform, CredentialKind::Secret, entity_id, secret)
    }

    /// Secret for an entity, if one is stored.
    pub fn get_credential(
        &self,
        platform: &Platform,
        entity_id: &EntityId,
    ) -> Result<Option<Credential>> {
        let key = credential_key(platform, CredentialKind::Secret, entity_id);
        Ok(self.store.get(&key)?.map(|secret| Credential {
            platform: platform.clone(),
            entity_id: entity_id.clone(),
            secret,
        }))
    }

    /// Whether a secret is stored for an entity. Does not decrypt.
    pub fn has_credential(&self, platform: &Platform, entity_id: &EntityId) -> Result<bool> {
        self.store
            .contains(&credential_key(platform, CredentialKind::Secret, entity_id))
    }

    /// Record which identity an entity belongs to.
    pub fn store_identity_link(
        &self,
        platform: &Platform,
        entity_id: &EntityId,
        identity: &IdentityId,
    ) -> Result<()> {
        self.put(
            platform,
            CredentialKind::IdentityLink,
            entity_id,
            &identity.to_string(),
        )
    }

    /// Identity an entity belongs to.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the stored link is not a UUID.
    pub fn get_identity_link(
        &self,
        platform: &Platform,
        entity_id: &EntityId,
    ) -> Result<Option<IdentityId>> {
        let key = credential_key(platform, CredentialKind::IdentityLink, entity_id);
        match self.store.get(&key)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| StoreError::Corrupt { key }.into()),
            None => Ok(None),
        }
    }

    /// Store the secret and the identity link for an entity together.
    ///
    /// Called once an authorization flow completes.
    pub fn bind(
        &self,
        platform: &Platform,
        entity_id: &EntityId,
        secret: &str,
        identity: &IdentityId,
    ) -> Result<()> {
        self.store_credential(platform, entity_id, secret)?;
        self.store_identity_link(platform, entity_id, identity)?;
        info!(%platform, entity = %entity_id, "credential bound");
        Ok(())
    }

    /// Every row of a kind, across platforms, keyed by raw record key.
    pub fn list_by_kind(&self, kind: CredentialKind) -> Result<BTreeMap<String, String>> {
        self.store.get_all(kind.tag())
    }

    /// Rows of a kind for one platform, keyed by decoded entity id.
    ///
    /// Keys that don't decode are logged and skipped.
    pub fn entities(
        &self,
        platform: &Platform,
        kind: CredentialKind,
    ) -> Result<BTreeMap<EntityId, String>> {
        let mut out = BTreeMap::new();
        for (key, value) in self.list_by_kind(kind)? {
            match parse_credential_key(&key, platform, kind) {
                Some(entity) => {
                    out.insert(entity, value);
                }
                None if key.starts_with(&format!("{}_", platform.as_str())) => {
                    warn!(key = %key, "undecodable credential key");
                }
                None => {}
            }
        }
        debug!(%platform, kind = kind.tag(), count = out.len(), "entities listed");
        Ok(out)
    }

    /// Entity ids with a row of `kind` on `platform`. Reads keys only, so a
    /// row that no longer decrypts still shows up here.
    pub fn entity_ids(&self, platform: &Platform, kind: CredentialKind) -> Result<Vec<EntityId>> {
        Ok(self
            .store
            .keys(kind.tag())?
            .iter()
            .filter_map(|key| parse_credential_key(key, platform, kind))
            .collect())
    }

    /// Drop the secret and identity link for an entity.
    pub fn revoke(&self, platform: &Platform, entity_id: &EntityId) -> Result<()> {
        self.store
            .delete(&credential_key(platform, CredentialKind::Secret, entity_id))?;
        self.store.delete(&credential_key(
            platform,
            CredentialKind::IdentityLink,
            entity_id,
        ))?;
        info!(%platform, entity = %entity_id, "credential revoked");
        Ok(())
    }

    /// Revoke every entity of `platform` linked to `identity`.
    ///
    /// Used when a user restarts a platform's authorization, so stale tokens
    /// for entities they no longer grant don't linger.
    ///
    /// # Returns
    ///
    /// The entities revoked.
    pub fn revoke_identity(
        &self,
        platform: &Platform,
        identity: &IdentityId,
    ) -> Result<Vec<EntityId>> {
        let linked: Vec<EntityId> = self
            .entities(platform, CredentialKind::IdentityLink)?
            .into_iter()
            .filter(|(_, raw)| raw.parse::<IdentityId>().ok().as_ref() == Some(identity))
            .map(|(entity, _)| entity)
            .collect();

        for entity in &linked {
            self.revoke(platform, entity)?;
        }
        Ok(linked)
    }

    fn put(
        &self,
        platform: &Platform,
        kind: CredentialKind,
        entity_id: &EntityId,
        value: &str,
    ) -> Result<()> {
        let key = credential_key(platform, kind, entity_id);
        validate_key(&key)?;
        self.store.put(&key, value, kind.tag())
    }
}
