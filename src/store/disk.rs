//! Durable cache store on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CacheEntry, CacheStore};
use crate::config::check_cache_name;
use crate::error::{Error, Result};
use crate::fetch::Response;

const ENTRY_EXT: &str = "json";

/// On-disk form of a cache entry. The body is base64 so that one file holds
/// the whole entry and a single rename commits it.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    url: String,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
    body: String,
}

/// Only the key, for listing without decoding bodies.
#[derive(Deserialize)]
struct StoredKey {
    key: String,
}

impl StoredEntry {
    fn encode(key: &str, entry: &CacheEntry) -> Self {
        Self {
            key: key.to_string(),
            url: entry.response.url.clone(),
            status: entry.response.status,
            content_type: entry.response.content_type.clone(),
            stored_at: entry.stored_at,
            body: BASE64.encode(&entry.response.body),
        }
    }

    fn decode(self) -> Result<CacheEntry> {
        let body = BASE64
            .decode(self.body.as_bytes())
            .map_err(|e| Error::Store(format!("{}: {e}", self.key)))?;
        Ok(CacheEntry {
            response: Response {
                url: self.url,
                status: self.status,
                content_type: self.content_type,
                body: body.into(),
            },
            stored_at: self.stored_at,
        })
    }
}

/// Durable store keeping one directory per cache and one JSON file per entry.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskStore {
    /// Creates a store rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of `cache`. Names that would resolve to the store root or
    /// outside it are rejected.
    fn cache_dir(&self, cache: &str) -> Result<PathBuf> {
        check_cache_name(cache).map_err(|reason| Error::InvalidConfig(format!("cache {reason}")))?;
        let name: String = cache
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.root.join(name))
    }

    fn entry_path(&self, cache: &str, key: &str) -> Result<PathBuf> {
        let digest = Sha256::digest(key.as_bytes());
        Ok(self
            .cache_dir(cache)?
            .join(format!("{digest:x}.{ENTRY_EXT}")))
    }

    fn tmp_path(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("{}.{n}.tmp", std::process::id()))
    }
}

fn is_not_found(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::NotFound
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(self.cache_dir(cache)?).await {
            Ok(dir) => dir,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != ENTRY_EXT) {
                continue;
            }
            let contents = match tokio::fs::read(&path).await {
                Ok(contents) => contents,
                // Removed concurrently between listing and reading.
                Err(e) if is_not_found(&e) => continue,
                Err(e) => return Err(e.into()),
            };
            let stored: StoredKey = serde_json::from_slice(&contents)
                .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
            keys.push(stored.key);
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(cache, key)?;
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredEntry = serde_json::from_slice(&contents)
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
        stored.decode().map(Some)
    }

    async fn put(&self, cache: &str, key: &str, entry: CacheEntry) -> Result<()> {
        tokio::fs::create_dir_all(self.cache_dir(cache)?).await?;

        let path = self.entry_path(cache, key)?;
        let tmp_path = self.tmp_path(&path);
        let json = serde_json::to_vec(&StoredEntry::encode(key, &entry))?;

        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, cache: &str, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.entry_path(cache, key)?).await {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.cache_dir(cache)?).await {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str, body: &'static [u8]) -> CacheEntry {
        CacheEntry::new(Response::ok(url, body).with_content_type("application/wasm"))
    }

    #[tokio::test]
    async fn put_then_get_preserves_entry() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        let original = entry("https://app.test/app.wasm", b"\0asm\x01\0\0\0");

        store
            .put("live", "https://app.test/app.wasm", original.clone())
            .await
            .unwrap();

        let loaded = store
            .get("live", "https://app.test/app.wasm")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn keys_lists_original_request_keys() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        for key in ["https://app.test/b.js", "https://app.test/", "https://app.test/a.js"] {
            store.put("live", key, entry(key, b"x")).await.unwrap();
        }
        // Stray temp files are ignored.
        std::fs::write(dir.path().join("live").join("junk.tmp"), b"{").unwrap();

        assert_eq!(
            store.keys("live").await.unwrap(),
            vec![
                "https://app.test/".to_string(),
                "https://app.test/a.js".to_string(),
                "https://app.test/b.js".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_cache_and_entry() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path().join("never-created"));
        assert!(store.keys("live").await.unwrap().is_empty());
        assert!(store.get("live", "k").await.unwrap().is_none());
        assert!(!store.remove("live", "k").await.unwrap());
        assert!(!store.delete_cache("live").await.unwrap());
    }

    #[tokio::test]
    async fn delete_cache_removes_directory() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        store.put("temp", "k", entry("k", b"x")).await.unwrap();
        assert!(dir.path().join("temp").exists());

        assert!(store.delete_cache("temp").await.unwrap());
        assert!(!dir.path().join("temp").exists());
        assert!(store.keys("temp").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_names_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        store.put("../escape", "k", entry("k", b"x")).await.unwrap();
        assert!(dir.path().join(".._escape").is_dir());
    }

    #[tokio::test]
    async fn names_resolving_outside_a_cache_are_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("stores");
        let store = DiskStore::new(&root);
        store.put("live", "k", entry("k", b"x")).await.unwrap();

        for bad in ["", ".", ".."] {
            assert!(
                matches!(store.delete_cache(bad).await, Err(Error::InvalidConfig(_))),
                "{bad:?}"
            );
            assert!(store.put(bad, "k", entry("k", b"x")).await.is_err());
        }
        assert!(root.join("live").is_dir());
        assert_eq!(store.keys("live").await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_entry_is_store_error() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path());
        store.put("live", "k", entry("k", b"x")).await.unwrap();
        let path = store.entry_path("live", "k").unwrap();
        std::fs::write(&path, b"{\"key\":\"k\"}").unwrap();

        assert!(matches!(store.get("live", "k").await, Err(Error::Store(_))));
    }
}
