//! In-memory cache store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{CacheEntry, CacheStore};
use crate::error::Result;

type Caches = HashMap<String, BTreeMap<String, CacheEntry>>;

/// In-process store, used for tests and ephemeral workers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    caches: Mutex<Caches>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Caches> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if `cache` has been created and not deleted.
    #[must_use]
    pub fn has_cache(&self, cache: &str) -> bool {
        self.lock().contains_key(cache)
    }

    /// Number of entries in `cache`.
    #[must_use]
    pub fn len(&self, cache: &str) -> usize {
        self.lock().get(cache).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self
            .lock()
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, cache: &str, key: &str, entry: CacheEntry) -> Result<()> {
        self.lock()
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, cache: &str, key: &str) -> Result<bool> {
        Ok(self
            .lock()
            .get_mut(cache)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        Ok(self.lock().remove(cache).is_some())
    }
}
