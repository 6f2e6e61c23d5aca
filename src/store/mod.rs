//! Named key-value stores of cached responses.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::fetch::Response;

/// A response stored in a cache together with when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Wraps a response, stamping it with the current time.
    #[must_use]
    pub fn new(response: Response) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Abstraction over a set of named caches.
///
/// Opening is implicit: reading a cache that does not exist behaves like
/// reading an empty one, and the first `put` creates it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Lists every request key in `cache`.
    async fn keys(&self, cache: &str) -> Result<Vec<String>>;

    /// Looks up a single entry.
    async fn get(&self, cache: &str, key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts or replaces an entry. Last write wins.
    async fn put(&self, cache: &str, key: &str, entry: CacheEntry) -> Result<()>;

    /// Removes an entry, returning whether it existed.
    async fn remove(&self, cache: &str, key: &str) -> Result<bool>;

    /// Deletes a whole cache, returning whether it existed.
    async fn delete_cache(&self, cache: &str) -> Result<bool>;
}

#[async_trait]
impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        (**self).keys(cache).await
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<CacheEntry>> {
        (**self).get(cache, key).await
    }

    async fn put(&self, cache: &str, key: &str, entry: CacheEntry) -> Result<()> {
        (**self).put(cache, key, entry).await
    }

    async fn remove(&self, cache: &str, key: &str) -> Result<bool> {
        (**self).remove(cache, key).await
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        (**self).delete_cache(cache).await
    }
}
