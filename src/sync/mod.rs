//! The asset cache synchronizer.
//!
//! A [`Synchronizer`] owns three named caches in a [`CacheStore`]:
//!
//! | Cache | Contents |
//! |-------|----------|
//! | staging | shell resources fetched during [`install`](Synchronizer::install) |
//! | live | everything served by [`handle_fetch`](Synchronizer::handle_fetch) |
//! | snapshot | the manifest applied by the last activation |
//!
//! Lifecycle: `install` then `activate`. Activation reconciles the live cache
//! against the previous manifest so that unchanged resources are never
//! downloaded again.

mod activate;
mod batch;
mod control;
mod install;
mod intercept;
mod offline;


pub use activate::ReconcilePlan;
pub use control::ControlMessage;
pub use intercept::{FetchOutcome, ResponseSource};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{AppConfig, SyncConfig};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher, Response};
use crate::key::stored_key;
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::manifest::{BuildManifest, Manifest, ShellSet};
use crate::store::{CacheEntry, CacheStore, DiskStore};

/// Key of the single entry in the snapshot cache.
const SNAPSHOT_KEY: &str = "manifest";

/// Trait for receiving synchronization progress updates.
///
/// All methods have default no-op implementations.
pub trait SyncProgress: Send + Sync {
    /// Called when a batch request for `url` is issued.
    fn on_fetch_start(&self, _url: &str) {}

    /// Called when an entry is written to a cache.
    fn on_stored(&self, _url: &str, _bytes: u64) {}

    /// Called when activation evicts a live entry.
    fn on_evicted(&self, _url: &str) {}

    /// Called when a batch request fails.
    fn on_error(&self, _url: &str, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl SyncProgress for NoProgress {}

/// Comparison of the live cache against the current manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    /// Manifest resources present in the live cache.
    pub cached: usize,
    /// Manifest resources absent from the live cache.
    pub missing: Vec<String>,
    /// Live entries that map to no manifest resource.
    pub unlisted: usize,
    /// Whether the stored snapshot equals the current manifest.
    pub snapshot_current: bool,
}

/// Versioned asset cache synchronizer.
pub struct Synchronizer<S: CacheStore = DiskStore, F: Fetcher = HttpFetcher> {
    config: SyncConfig,
    manifest: Manifest,
    shell: ShellSet,
    store: S,
    fetcher: F,
    progress: Arc<dyn SyncProgress>,
    lifecycle: Mutex<Lifecycle>,
}

impl Synchronizer<DiskStore, HttpFetcher> {
    /// Creates a synchronizer on the durable store configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell is inconsistent with the manifest or
    /// the HTTP client cannot be built.
    pub fn open(config: &AppConfig, build: BuildManifest) -> Result<Self> {
        Self::new(
            config.sync.clone(),
            build,
            DiskStore::new(config.paths.store_dir.clone()),
            HttpFetcher::new()?,
        )
    }
}

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Creates an uninstalled synchronizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache names are unusable or a shell key is
    /// not listed in the manifest.
    pub fn new(config: SyncConfig, build: BuildManifest, store: S, fetcher: F) -> Result<Self> {
        config.caches.validate()?;
        build.shell.validate(&build.resources)?;
        Ok(Self {
            config,
            manifest: build.resources,
            shell: build.shell,
            store,
            fetcher,
            progress: Arc::new(NoProgress),
            lifecycle: Mutex::new(Lifecycle::new()),
        })
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn SyncProgress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub const fn shell(&self) -> &ShellSet {
        &self.shell
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.lifecycle().state()
    }

    /// Whether this worker has claimed its clients.
    #[must_use]
    pub fn is_controlling(&self) -> bool {
        self.lifecycle().claimed()
    }

    /// Whether this worker may take over without a waiting phase.
    #[must_use]
    pub fn skips_waiting(&self) -> bool {
        self.lifecycle().skip_waiting()
    }

    /// Re-attaches to caches activated by an earlier run of the same build.
    ///
    /// The worker becomes `Active` only if the stored snapshot equals the
    /// current manifest; otherwise it stays `Uninstalled` and must go through
    /// install and activate.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub async fn attach(&self) -> Result<bool> {
        let current = self
            .read_snapshot()
            .await?
            .is_some_and(|snapshot| snapshot == self.manifest);
        if current {
            self.lifecycle().resume_active();
            log::info!("Attached to active caches for {}", self.config.origin);
        } else {
            log::info!("No activated snapshot for this manifest");
        }
        Ok(current)
    }

    /// Compares the live cache with the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if a cache cannot be read.
    pub async fn status(&self) -> Result<CacheStatus> {
        let present = self.live_resource_keys().await?;
        let (cached, missing): (Vec<_>, Vec<_>) = self
            .manifest
            .keys()
            .map(str::to_string)
            .partition(|key| present.contains(key));
        let unlisted = present
            .iter()
            .filter(|key| !self.manifest.contains(key))
            .count();
        let snapshot_current = self
            .read_snapshot()
            .await?
            .is_some_and(|snapshot| snapshot == self.manifest);

        Ok(CacheStatus {
            cached: cached.len(),
            missing,
            unlisted,
            snapshot_current,
        })
    }

    /// Logical resource keys of every live entry.
    async fn live_resource_keys(&self) -> Result<HashSet<String>> {
        let origin = &self.config.origin;
        Ok(self
            .store
            .keys(&self.config.caches.live)
            .await?
            .iter()
            .filter_map(|url| stored_key(url, origin))
            .collect())
    }

    /// Reads the manifest recorded by the last successful activation.
    async fn read_snapshot(&self) -> Result<Option<Manifest>> {
        let Some(entry) = self
            .store
            .get(&self.config.caches.snapshot, SNAPSHOT_KEY)
            .await?
        else {
            return Ok(None);
        };
        Manifest::from_json(&entry.response.body).map(Some)
    }

    async fn write_snapshot(&self) -> Result<()> {
        let response = Response::ok(SNAPSHOT_KEY, self.manifest.to_json()?)
            .with_content_type("application/json");
        self.store
            .put(
                &self.config.caches.snapshot,
                SNAPSHOT_KEY,
                CacheEntry::new(response),
            )
            .await
    }
}
