//! Scripted network and instrumented storage for engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;
use url::Url;

use stalecache_core::{
    CacheGeneration, CacheRequest, CacheStorage, Error, PolicyConfig, ResponseSnapshot, ResponseType,
};

use crate::fetch::Network;

pub(crate) fn policy(version: &str) -> PolicyConfig {
    PolicyConfig::new(version, Url::parse("https://app.example.com").unwrap())
}

pub(crate) fn ok_response(url: &str, body: &str) -> ResponseSnapshot {
    ResponseSnapshot {
        url: url.to_string(),
        status: 200,
        status_text: "OK".to_string(),
        response_type: ResponseType::Basic,
        headers: BTreeMap::from([("content-type".to_string(), "text/plain".to_string())]),
        body: Bytes::copy_from_slice(body.as_bytes()),
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[derive(Clone)]
enum Script {
    Respond(ResponseSnapshot),
    Fail(String),
    Hang,
    Gated(Arc<Notify>, ResponseSnapshot),
}

/// Network that answers per URL from a fixed script.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, url: &str, response: ResponseSnapshot) -> Self {
        self.scripts.insert(url.to_string(), Script::Respond(response));
        self
    }

    pub(crate) fn fail(mut self, url: &str, reason: &str) -> Self {
        self.scripts.insert(url.to_string(), Script::Fail(reason.to_string()));
        self
    }

    /// Never resolves.
    pub(crate) fn hang(mut self, url: &str) -> Self {
        self.scripts.insert(url.to_string(), Script::Hang);
        self
    }

    /// Resolves once the returned `Notify` fires.
    pub(crate) fn gated(mut self, url: &str, response: ResponseSnapshot) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.scripts.insert(url.to_string(), Script::Gated(Arc::clone(&gate), response));
        (self, gate)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<ResponseSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(request.url.as_str()).cloned() {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail(reason)) => Err(Error::Network(reason)),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    lookups: AtomicUsize,
    puts: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    lookups: bool,
    puts: bool,
}

/// Storage wrapper that counts every call reaching the store and can be
/// told to fail lookups or writes.
#[derive(Clone)]
pub(crate) struct CountingStorage<S> {
    inner: S,
    counters: Arc<Counters>,
    faults: Faults,
}

impl<S> CountingStorage<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner, counters: Arc::default(), faults: Faults::default() }
    }

    /// Every `match_request` fails after being counted.
    pub(crate) fn failing_lookups(mut self) -> Self {
        self.faults.lookups = true;
        self
    }

    /// Every `put` fails after being counted.
    pub(crate) fn failing_puts(mut self) -> Self {
        self.faults.puts = true;
        self
    }

    pub(crate) fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn lookups(&self) -> usize {
        self.counters.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> usize {
        self.counters.puts.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub(crate) struct CountingGeneration<G> {
    inner: G,
    counters: Arc<Counters>,
    faults: Faults,
}

#[async_trait::async_trait]
impl<S: CacheStorage> CacheStorage for CountingStorage<S> {
    type Generation = CountingGeneration<S::Generation>;

    async fn open(&self, name: &str) -> Result<Self::Generation, Error> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.open(name).await?;
        Ok(CountingGeneration { inner, counters: Arc::clone(&self.counters), faults: self.faults })
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }
}

#[async_trait::async_trait]
impl<G: CacheGeneration> CacheGeneration for CountingGeneration<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn put(&self, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error> {
        self.counters.puts.fetch_add(1, Ordering::SeqCst);
        if self.faults.puts {
            return Err(Error::InvalidInput("store is read-only".into()));
        }
        self.inner.put(request, response).await
    }

    async fn match_request(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        if self.faults.lookups {
            return Err(Error::CorruptEntry("unreadable row".into()));
        }
        self.inner.match_request(request).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }
}

/// Poll a generation until the entry for `request` satisfies `check`.
pub(crate) async fn wait_for_entry<G, F>(generation: &G, request: &CacheRequest, check: F) -> bool
where
    G: CacheGeneration,
    F: Fn(&ResponseSnapshot) -> bool,
{
    for _ in 0..100 {
        if let Ok(Some(response)) = generation.match_request(request).await
            && check(&response)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll until the store has seen at least `puts` writes.
pub(crate) async fn wait_for_puts<S>(storage: &CountingStorage<S>, puts: usize) {
    for _ in 0..100 {
        if storage.puts() >= puts {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("store saw {} puts, expected {puts}", storage.puts());
}

/// Poll until the network has seen at least `calls` fetches.
pub(crate) async fn wait_for_calls(network: &FakeNetwork, calls: usize) {
    for _ in 0..100 {
        if network.calls() >= calls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("network saw {} calls, expected {calls}", network.calls());
}
