//! All-or-nothing batch fetches into a cache.

use futures::{StreamExt, TryStreamExt, stream};

use super::Synchronizer;
use crate::error::{Error, Result};
use crate::fetch::{CacheMode, Fetcher, Request, Response};
use crate::key::resource_url;
use crate::stats::{BatchStats, BatchStatsBuilder};
use crate::store::{CacheEntry, CacheStore};

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Fetches every resource in `keys` and stores them in `cache`.
    ///
    /// All or nothing: nothing is written unless every request succeeds
    /// with a 2xx status.
    pub(super) async fn fetch_and_store_all(
        &self,
        cache: &str,
        keys: &[String],
        mode: CacheMode,
    ) -> Result<BatchStats> {
        let mut builder = BatchStatsBuilder::new(keys.len());
        if keys.is_empty() {
            return Ok(builder.build());
        }

        let responses: Vec<(Request, Response)> = stream::iter(keys)
            .map(|key| {
                let request =
                    Request::get(resource_url(&self.config.origin, key)).with_cache_mode(mode);
                async move {
                    self.progress.on_fetch_start(&request.url);
                    let result = self.fetcher.fetch(&request).await.and_then(|response| {
                        if response.is_success() {
                            Ok(response)
                        } else {
                            Err(Error::Status {
                                url: request.url.clone(),
                                status: response.status,
                            })
                        }
                    });
                    match result {
                        Ok(response) => Ok((request, response)),
                        Err(e) => {
                            self.progress.on_error(&request.url, &e.to_string());
                            Err(e)
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrent_fetches.max(1))
            .try_collect()
            .await?;

        for (request, response) in responses {
            let bytes = response.body.len() as u64;
            let key = request.cache_key();
            self.store
                .put(cache, &key, CacheEntry::new(response))
                .await?;
            self.progress.on_stored(&key, bytes);
            builder.add_stored(bytes);
        }

        Ok(builder.build())
    }
}
