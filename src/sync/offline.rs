//! On-demand download of every resource for offline use.

use super::Synchronizer;
use crate::error::Result;
use crate::fetch::{CacheMode, Fetcher};
use crate::stats::BatchStats;
use crate::store::CacheStore;

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Manifest resources that have no entry in the live cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the live cache cannot be listed.
    pub async fn missing_resources(&self) -> Result<Vec<String>> {
        let present = self.live_resource_keys().await?;
        Ok(self
            .manifest
            .keys()
            .filter(|key| !present.contains(*key))
            .map(str::to_string)
            .collect())
    }

    /// Downloads every manifest resource missing from the live cache in a
    /// single all-or-nothing batch.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or store error; nothing is written then.
    pub async fn download_offline(&self) -> Result<BatchStats> {
        let missing = self.missing_resources().await?;
        if missing.is_empty() {
            log::info!("All {} resource(s) already cached", self.manifest.len());
        } else {
            log::info!("Downloading {} missing resource(s) for offline use", missing.len());
        }

        let stats = self
            .fetch_and_store_all(&self.config.caches.live, &missing, CacheMode::Default)
            .await?;
        log::info!("Offline download stored {} resource(s)", stats.stored);
        Ok(stats)
    }
}
