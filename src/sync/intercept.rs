//! Request interception with cache-first and online-first strategies.

use reqwest::Method;

use super::Synchronizer;
use crate::error::Result;
use crate::fetch::{Fetcher, Request, Response};
use crate::key::{ROOT_KEY, request_key};
use crate::lifecycle::WorkerState;
use crate::store::{CacheEntry, CacheStore};

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Result of routing a request through the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; the caller should perform its default network handling.
    Passthrough,
    /// Answered by the synchronizer.
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchOutcome {
    /// Returns the response, if the request was handled.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        match self {
            Self::Passthrough => None,
            Self::Respond { response, .. } => Some(response),
        }
    }

    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

impl<S: CacheStore, F: Fetcher> Synchronizer<S, F> {
    /// Routes a request.
    ///
    /// Only `GET` requests for manifest resources are handled, and only
    /// while the worker is `Active`. The entry page is served online-first,
    /// everything else cache-first.
    ///
    /// # Errors
    ///
    /// Returns the network error of a cache-first miss, or of an
    /// online-first request with no cached fallback, and any store read
    /// error.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
        if request.method != Method::GET {
            return Ok(FetchOutcome::Passthrough);
        }
        let state = self.state();
        if state != WorkerState::Active {
            log::debug!("Not intercepting {} while {state}", request.url);
            return Ok(FetchOutcome::Passthrough);
        }
        let Some(key) = request_key(&request.url, &self.config.origin) else {
            return Ok(FetchOutcome::Passthrough);
        };
        if !self.manifest.contains(&key) {
            log::debug!("{} is not a manifest resource", request.url);
            return Ok(FetchOutcome::Passthrough);
        }

        if key == ROOT_KEY {
            self.online_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    /// Stores a copy of a response in the live cache. Failures are logged
    /// and never affect the response returned to the caller.
    async fn populate(&self, request: &Request, response: &Response) {
        let entry = CacheEntry::new(response.clone());
        if let Err(e) = self
            .store
            .put(&self.config.caches.live, &request.cache_key(), entry)
            .await
        {
            log::warn!("Failed to cache {}: {e}", request.url);
        }
    }

    async fn online_first(&self, request: &Request) -> Result<FetchOutcome> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.populate(request, &response).await;
                Ok(FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(network_err) => {
                log::debug!("{} unreachable, trying cache: {network_err}", request.url);
                match self
                    .store
                    .get(&self.config.caches.live, &request.cache_key())
                    .await?
                {
                    Some(entry) => Ok(FetchOutcome::Respond {
                        response: entry.response,
                        source: ResponseSource::Cache,
                    }),
                    None => Err(network_err),
                }
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome> {
        if let Some(entry) = self
            .store
            .get(&self.config.caches.live, &request.cache_key())
            .await?
        {
            return Ok(FetchOutcome::Respond {
                response: entry.response,
                source: ResponseSource::Cache,
            });
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            self.populate(request, &response).await;
        }
        Ok(FetchOutcome::Respond {
            response,
            source: ResponseSource::Network,
        })
    }
}
