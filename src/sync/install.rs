//! Install: stage the application shell.

use super::Synchronizer;
use crate::error::Result;
use crate::fetch::{CacheMode, Fetcher};
use crate::stats::BatchStats;
use crate::store::CacheStore;

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Downloads the application shell into the staging cache.
    ///
    /// Every shell resource is fetched with [`CacheMode::Reload`]. A single
    /// failure fails the install and leaves the worker `Failed`; it cannot be
    /// activated until a later install succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`](crate::Error::InvalidState) unless the
    /// worker is uninstalled or failed, and any fetch or store error.
    pub async fn install(&self) -> Result<BatchStats> {
        self.lifecycle().begin_install()?;
        log::info!(
            "Installing {} shell resource(s) from {}",
            self.shell.len(),
            self.config.origin
        );

        let staging = &self.config.caches.staging;
        let result = match self.store.delete_cache(staging).await {
            // Leftovers from an interrupted install must not be promoted.
            Ok(_) => {
                self.fetch_and_store_all(staging, self.shell.keys(), CacheMode::Reload)
                    .await
            }
            Err(e) => Err(e),
        };

        self.lifecycle().finish_install(result.is_ok());
        match result {
            Ok(stats) => {
                log::info!("Install complete: {} resource(s) staged", stats.stored);
                Ok(stats)
            }
            Err(e) => {
                log::error!("Install failed: {e}");
                Err(e)
            }
        }
    }
}
