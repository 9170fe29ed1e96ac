//! Configuration loading and context wiring.

mod support;
use support::*;

use std::sync::Arc;

use tether::core::sync::SyncStatus;
use tether::error::{ConfigError, Error};
use tether::{Config, Context, EntityId, IdentityId, Platform};

#[test]
fn test_load_from_file() {
    let t = Test::new();
    let creds = t.path("data/creds.db");
    let file = t.path("tether.toml");
    std::fs::write(
        &file,
        format!(
            r#"
secret = "{TEST_SECRET}"
credentials_db = "{}"
session_ttl_secs = 600

[sync]
timeout_secs = 3
"#,
            creds.display()
        ),
    )
    .unwrap();

    let config = Config::load(&file).unwrap();
    assert_eq!(config.credentials_db, creds);
    assert_eq!(config.session_ttl_secs, 600);
    assert_eq!(config.sync_timeout().as_secs(), 3);
    assert_eq!(config.retry_policy().attempts, 3);
}

#[test]
fn test_missing_file() {
    let t = Test::new();
    assert!(matches!(
        Config::load(&t.path("nope.toml")),
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}

#[test]
fn test_open_creates_database_directories() {
    let mut t = Test::new();
    t.config.credentials_db = t.path("nested/dir/credentials.db");
    let ctx = t.context();

    let platform = Platform::new("shop").unwrap();
    let entity = EntityId::new("a.example").unwrap();
    ctx.vault.store_credential(&platform, &entity, "tok").unwrap();
    assert!(t.path("nested/dir/credentials.db").exists());
}

#[test]
fn test_same_secret_reads_other_workers_rows() {
    let t = Test::new();
    let platform = Platform::new("shop").unwrap();
    let entity = EntityId::new("a.example").unwrap();
    t.context()
        .vault
        .store_credential(&platform, &entity, "tok")
        .unwrap();

    let credential = t
        .context()
        .vault
        .get_credential(&platform, &entity)
        .unwrap()
        .unwrap();
    assert_eq!(credential.secret, "tok");
}

#[test]
fn test_different_secret_cannot_read_rows() {
    let t = Test::new();
    let platform = Platform::new("shop").unwrap();
    let entity = EntityId::new("a.example").unwrap();
    t.context()
        .vault
        .store_credential(&platform, &entity, "tok")
        .unwrap();

    let mut other = t.config.clone();
    other.secret = "another-secret".to_string().into();
    let ctx = Context::open(&other).unwrap();
    assert!(ctx.vault.get_credential(&platform, &entity).is_err());
}

#[test]
fn test_open_rejects_empty_secret() {
    let mut t = Test::new();
    t.config.secret = String::new().into();
    assert!(matches!(
        Context::open(&t.config),
        Err(Error::Config(ConfigError::MissingSecret))
    ));
}

#[tokio::test]
async fn test_context_builds_configured_engine() {
    let t = Test::new();
    let ctx = t.context();
    let platform = Platform::new("shop").unwrap();
    let entity = EntityId::new("x").unwrap();
    ctx.vault
        .bind(&platform, &entity, "tok", &IdentityId::new())
        .unwrap();

    let objects = Arc::new(MemoryObjects::default());
    let engine = ctx.sync_engine(
        platform,
        Arc::new(ScriptedFetcher::new(sample_document())),
        objects.clone(),
    );
    let records = engine.poll().await.unwrap();
    assert_eq!(statuses(&records), vec![SyncStatus::Uploaded]);
    assert_eq!(objects.puts(), 1);
}
