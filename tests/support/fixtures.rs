//! Test fixtures: constants and collaborator fakes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tether::core::sync::{Acl, FetchError, Fetcher, ObjectError, ObjectStore};
use tether::core::vault::Credential;

/// Long-term secret used by every test context.
pub const TEST_SECRET: &str = "test-secret-do-not-use";

/// A small platform document.
pub fn sample_document() -> Value {
    json!({
        "shop": "x.myshopify.com",
        "orders": [{"id": 1, "total": "12.50"}, {"id": 2, "total": "8.00"}],
        "currency": "EUR"
    })
}

/// In-memory object store that counts writes.
#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    acls: Mutex<Vec<Acl>>,
}

impl MemoryObjects {
    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn acls(&self) -> Vec<Acl> {
        self.acls.lock().unwrap().clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ObjectError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ObjectError::Transport("read refused".into()));
        }
        self.read(path).ok_or(ObjectError::NotFound)
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, acl: Acl) -> Result<(), ObjectError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ObjectError::Transport("write refused".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.acls.lock().unwrap().push(acl);
        self.insert(path, &bytes);
        Ok(())
    }
}

/// Fetcher that replays scripted outcomes, then a fallback document.
///
/// Records the (tokio) time of every call so tests can inspect backoff gaps.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Value, FetchError>>>,
    fallback: Mutex<Value>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<tokio::time::Instant>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(fallback: Value) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            failing: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue outcomes to return before falling back.
    pub fn then(self, outcome: Result<Value, FetchError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Always fail for this entity id.
    pub fn fail_for(self, entity: &str) -> Self {
        self.failing.lock().unwrap().push(entity.to_string());
        self
    }

    pub fn set_fallback(&self, value: Value) {
        *self.fallback.lock().unwrap() = value;
    }

    pub fn calls(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().unwrap().clone()
    }

    /// Most fetches ever running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, credential: &Credential) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(tokio::time::Instant::now());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|e| e == credential.entity_id.as_str())
        {
            return Err(FetchError::Failed("platform said no".into()));
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }
}
