//! asset-sync - versioned asset cache synchronization.
//!
//! Keeps a durable cache of an application's static resources consistent
//! with the build manifest that describes them. A new build installs its
//! shell into a staging cache, then activation promotes it and evicts only
//! the cached resources whose fingerprint changed, so unchanged assets are
//! never downloaded twice.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use asset_sync::{AppConfig, BuildManifest, Request, Synchronizer};
//!
//! # async fn example() -> asset_sync::Result<()> {
//! let config = AppConfig::load(None)?;
//! let build = BuildManifest::load(Path::new("build/asset-manifest.json"))?;
//!
//! let sync = Synchronizer::open(&config, build)?;
//! sync.install().await?;
//! let report = sync.activate().await?;
//! println!("{} resource(s) kept across the upgrade", report.retained);
//!
//! let outcome = sync
//!     .handle_fetch(&Request::get("http://localhost/main.js"))
//!     .await?;
//! if let Some(response) = outcome.response() {
//!     println!("{} bytes", response.body.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod key;
pub mod lifecycle;
pub mod manifest;
pub mod stats;
pub mod store;
pub mod sync;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{AppConfig, CacheNames, PathConfig, SyncConfig};
pub use error::{Error, Result};
pub use fetch::{CacheMode, Fetcher, HttpFetcher, Request, Response};
pub use format::{format_bytes, format_duration};
pub use lifecycle::WorkerState;
pub use manifest::{BuildManifest, Manifest, ShellSet};
pub use stats::{ActivationOutcome, ActivationReport, BatchStats, BatchStatsBuilder};
pub use store::{CacheEntry, CacheStore, DiskStore, MemoryStore};
pub use sync::{
    CacheStatus, ControlMessage, FetchOutcome, NoProgress, ReconcilePlan, ResponseSource,
    SyncProgress, Synchronizer,
};
