//! Storage traits for versioned cache generations.
//!
//! A [`CacheStorage`] holds any number of named generations; opening one
//! yields a [`CacheGeneration`] handle that reads and writes entries. Both
//! SQLite ([`super::CacheDb`]) and in-memory ([`super::MemoryStorage`])
//! backends implement these traits so the policy engine can be driven
//! against either.

use super::entry::{CacheRequest, ResponseSnapshot};
use crate::Error;

/// A set of named cache generations.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Handle to a single generation.
    type Generation: CacheGeneration;

    /// Open the named generation, creating it if absent.
    async fn open(&self, name: &str) -> Result<Self::Generation, Error>;

    /// Whether a generation with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Names of every existing generation, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all of its entries.
    ///
    /// Returns false when no generation had that name.
    async fn delete(&self, name: &str) -> Result<bool, Error>;
}

/// An open cache generation.
#[async_trait::async_trait]
pub trait CacheGeneration: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Store a response for a request, replacing any prior entry for the same identity.
    async fn put(&self, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Look up the stored response for a request.
    async fn match_request(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error>;

    /// URLs of every stored entry, in insertion order.
    async fn keys(&self) -> Result<Vec<String>, Error>;
}
