//! Wiring of the core components from a [`Config`].

use std::sync::Arc;

use tracing::info;

use crate::core::cipher::{derive_key, Aes256, Cipher};
use crate::core::clock::SystemClock;
use crate::core::codec::SecretCodec;
use crate::core::config::Config;
use crate::core::handoff::Handoff;
use crate::core::session::SessionLinker;
use crate::core::store::RecordStore;
use crate::core::sync::{Fetcher, ObjectStore, Poller, SyncEngine};
use crate::core::types::Platform;
use crate::core::vault::CredentialVault;
use crate::error::Result;

/// Opened stores and the services built on them.
///
/// Every process that shares the databases opens its own context from the
/// same secret; nothing here is global.
#[derive(Debug, Clone)]
pub struct Context {
    pub vault: CredentialVault,
    pub sessions: Arc<SessionLinker>,
    pub codec: SecretCodec,
    pub handoff: Handoff,
    config: Arc<Config>,
}

impl Context {
    /// Derive the record key and open both databases.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, the key can't be derived, or either
    /// database can't be opened.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let key = derive_key(config.secret.as_bytes())?;
        let cipher: Arc<dyn Cipher> = Arc::new(Aes256::new(&key));
        let cipher_name = cipher.name();
        let retry = config.retry_policy();

        let credentials = Arc::new(RecordStore::open(
            &config.credentials_db,
            Arc::clone(&cipher),
            retry,
        )?);
        let session_store = Arc::new(RecordStore::open(&config.sessions_db, cipher, retry)?);

        let clock = Arc::new(SystemClock);
        let sessions = Arc::new(SessionLinker::with_clock(
            session_store,
            clock.clone(),
            config.session_ttl_secs,
        ));
        let codec = SecretCodec::with_clock(config.secret.as_bytes(), clock);
        let handoff = Handoff::with_ttl(
            codec.clone(),
            Arc::clone(&sessions),
            config.token_ttl_secs,
        );

        info!(
            credentials = %config.credentials_db.display(),
            sessions = %config.sessions_db.display(),
            cipher = cipher_name,
            "context opened"
        );

        Ok(Self {
            vault: CredentialVault::new(credentials),
            sessions,
            codec,
            handoff,
            config: Arc::new(config.clone()),
        })
    }

    /// A sync engine for `platform` using the configured backoff and timeout.
    pub fn sync_engine(
        &self,
        platform: Platform,
        fetcher: Arc<dyn Fetcher>,
        objects: Arc<dyn ObjectStore>,
    ) -> SyncEngine {
        SyncEngine::new(platform, self.vault.clone(), fetcher, objects)
            .with_backoff(self.config.backoff())
            .with_timeout(self.config.sync_timeout())
    }

    /// A poller running `engine` at the configured interval.
    pub fn poller(&self, engine: Arc<SyncEngine>) -> Poller {
        Poller::new(engine, self.config.poll_interval())
    }
}
