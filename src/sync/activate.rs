//! Activation: reconcile the live cache against the previous manifest.

use super::Synchronizer;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::key::stored_key;
use crate::manifest::Manifest;
use crate::stats::{ActivationOutcome, ActivationReport};
use crate::store::CacheStore;

/// Which live entries survive an upgrade.
///
/// Computed from read-only inputs before any cache is modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Live request keys whose fingerprint is unchanged.
    pub retain: Vec<String>,
    /// Live request keys to delete.
    pub evict: Vec<String>,
}

impl ReconcilePlan {
    /// Splits `live_keys` into retained and evicted entries.
    ///
    /// An entry is retained only if its resource is listed in both manifests
    /// with the same fingerprint. Entries that map to no resource key (other
    /// origins) are evicted.
    #[must_use]
    pub fn compute(
        live_keys: &[String],
        origin: &str,
        previous: &Manifest,
        current: &Manifest,
    ) -> Self {
        let (retain, evict): (Vec<String>, Vec<String>) = live_keys.iter().cloned().partition(|url| {
            stored_key(url, origin).is_some_and(|key| current.unchanged_since(previous, &key))
        });
        Self { retain, evict }
    }
}

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Promotes the staged shell into the live cache.
    ///
    /// Reconciliation errors are not returned: they trigger a full reset of
    /// all three caches and are reported through
    /// [`ActivationOutcome::Reset`]. The worker is `Active` afterwards in
    /// both cases, but only claims its clients when reconciliation succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`](crate::Error::InvalidState) unless the
    /// worker is `Installed`.
    pub async fn activate(&self) -> Result<ActivationReport> {
        let skip_waiting = {
            let mut lifecycle = self.lifecycle();
            lifecycle.begin_activate()?;
            lifecycle.skip_waiting()
        };
        log::info!("Activating manifest with {} resource(s)", self.manifest.len());
        if skip_waiting {
            log::info!("Taking over without waiting for older clients");
        }

        let report = match self.reconcile().await {
            Ok(report) => {
                self.lifecycle().claim();
                log::info!(
                    "Activation complete ({:?}): {} retained, {} evicted, {} promoted",
                    report.outcome,
                    report.retained,
                    report.evicted,
                    report.promoted
                );
                report
            }
            Err(e) => {
                log::error!("Failed to upgrade caches, resetting: {e}");
                self.reset_caches().await;
                ActivationReport::reset(e.to_string())
            }
        };

        self.lifecycle().finish_activate();
        Ok(report)
    }

    async fn reconcile(&self) -> Result<ActivationReport> {
        let caches = &self.config.caches;

        // Phase one: read state and decide.
        let previous = self.read_snapshot().await?;
        let staged = self.store.keys(&caches.staging).await?;
        let plan = match &previous {
            Some(previous) => {
                let live_keys = self.store.keys(&caches.live).await?;
                Some(ReconcilePlan::compute(
                    &live_keys,
                    &self.config.origin,
                    previous,
                    &self.manifest,
                ))
            }
            None => None,
        };

        // Phase two: commit.
        let (outcome, retained, evicted) = match plan {
            None => {
                self.store.delete_cache(&caches.live).await?;
                (ActivationOutcome::ColdStart, 0, 0)
            }
            Some(plan) => {
                for url in &plan.evict {
                    self.store.remove(&caches.live, url).await?;
                    self.progress.on_evicted(url);
                    log::debug!("Evicted {url}");
                }
                (ActivationOutcome::Upgrade, plan.retain.len(), plan.evict.len())
            }
        };

        let mut promoted = 0;
        for url in &staged {
            if let Some(entry) = self.store.get(&caches.staging, url).await? {
                let bytes = entry.response.body.len() as u64;
                self.store.put(&caches.live, url, entry).await?;
                self.progress.on_stored(url, bytes);
                promoted += 1;
            }
        }
        self.store.delete_cache(&caches.staging).await?;
        self.write_snapshot().await?;

        Ok(ActivationReport {
            outcome,
            retained,
            evicted,
            promoted,
        })
    }

    /// Deletes every cache; an empty cache is preferred over an inconsistent one.
    async fn reset_caches(&self) {
        let caches = &self.config.caches;
        for name in [&caches.live, &caches.staging, &caches.snapshot] {
            if let Err(e) = self.store.delete_cache(name).await {
                log::error!("Failed to delete cache {name}: {e}");
            }
        }
    }
}
