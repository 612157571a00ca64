//! In-memory cache storage.
//!
//! Uses HashMaps behind a tokio RwLock. Nothing survives the process; this
//! backend exists for tests and for embedders that bring their own
//! persistence.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::{CacheRequest, ResponseSnapshot, VaryKey, ensure_storable};
use super::hash::request_key;
use super::store::{CacheGeneration, CacheStorage};
use crate::Error;

struct StoredEntry {
    seq: u64,
    url: String,
    vary: VaryKey,
    response: ResponseSnapshot,
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    by_key: HashMap<String, StoredEntry>,
}

#[derive(Default)]
struct Inner {
    generations: HashMap<String, Entries>,
    order: Vec<String>,
}

impl Inner {
    fn entries_mut(&mut self, name: &str) -> &mut Entries {
        if !self.generations.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.generations.entry(name.to_string()).or_default()
    }
}

/// Cache storage kept entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Handle to one generation of a [`MemoryStorage`].
///
/// Writing through a handle whose generation was deleted recreates it.
#[derive(Clone)]
pub struct MemoryGeneration {
    name: String,
    inner: Arc<RwLock<Inner>>,
}

#[async_trait::async_trait]
impl CacheStorage for MemoryStorage {
    type Generation = MemoryGeneration;

    async fn open(&self, name: &str) -> Result<MemoryGeneration, Error> {
        self.inner.write().await.entries_mut(name);
        Ok(MemoryGeneration { name: name.to_string(), inner: Arc::clone(&self.inner) })
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.inner.read().await.generations.contains_key(name))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|n| n != name);
        Ok(inner.generations.remove(name).is_some())
    }
}

#[async_trait::async_trait]
impl CacheGeneration for MemoryGeneration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error> {
        ensure_storable(request)?;
        let vary = VaryKey::capture(request, response)?;

        let mut inner = self.inner.write().await;
        let entries = inner.entries_mut(&self.name);
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.by_key.insert(
            request_key(request),
            StoredEntry { seq, url: request.url.to_string(), vary, response: response.clone() },
        );
        Ok(())
    }

    async fn match_request(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let inner = self.inner.read().await;
        let found = inner
            .generations
            .get(&self.name)
            .and_then(|entries| entries.by_key.get(&request_key(request)))
            .filter(|entry| entry.vary.matches(request))
            .map(|entry| entry.response.clone());
        Ok(found)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().await;
        let Some(entries) = inner.generations.get(&self.name) else {
            return Ok(Vec::new());
        };
        let mut stored: Vec<&StoredEntry> = entries.by_key.values().collect();
        stored.sort_by_key(|entry| entry.seq);
        Ok(stored.into_iter().map(|entry| entry.url.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::tests::make_response;
    use url::Url;

    fn get(url: &str) -> CacheRequest {
        CacheRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = MemoryStorage::new();
        let generation = storage.open("v1").await.unwrap();
        let response = make_response("https://example.com/", "hello");

        generation.put(&get("https://example.com/"), &response).await.unwrap();

        let found = generation.match_request(&get("https://example.com/")).await.unwrap();
        assert_eq!(found, Some(response));
        assert!(generation.match_request(&get("https://example.com/other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryStorage::new();
        let generation = storage.open("v1").await.unwrap();
        let request = get("https://example.com/app.js");

        generation.put(&request, &make_response("https://example.com/app.js", "old")).await.unwrap();
        generation.put(&request, &make_response("https://example.com/app.js", "new")).await.unwrap();

        let found = generation.match_request(&request).await.unwrap().unwrap();
        assert_eq!(&found.body[..], b"new");
        assert_eq!(generation.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let storage = MemoryStorage::new();
        let generation = storage.open("v1").await.unwrap();
        let request = CacheRequest::new("POST", Url::parse("https://example.com/form").unwrap());

        let result = generation.put(&request, &make_response("https://example.com/form", "x")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = MemoryStorage::new();
        let v1 = storage.open("v1").await.unwrap();
        let v2 = storage.open("v2").await.unwrap();
        let request = get("https://example.com/");

        v1.put(&request, &make_response("https://example.com/", "one")).await.unwrap();

        assert!(v2.match_request(&request).await.unwrap().is_none());
        assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_drops_entries() {
        let storage = MemoryStorage::new();
        let v1 = storage.open("v1").await.unwrap();
        v1.put(&get("https://example.com/"), &make_response("https://example.com/", "one")).await.unwrap();

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert!(!storage.has("v1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
        assert!(v1.match_request(&get("https://example.com/")).await.unwrap().is_none());
    }
}
