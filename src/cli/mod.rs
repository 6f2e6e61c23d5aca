//! CLI mode for asset-sync: install, activate and inspect a local cache.

mod progress;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::io::AsyncWriteExt;

use crate::{AppConfig, BuildManifest, FetchOutcome, Request, ResponseSource, Synchronizer};

use progress::{BarProgress, make_progress_bar, print_activation, print_batch, print_status};

/// A CLI subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Install the manifest's shell and activate it.
    Sync,
    /// Route one GET request through the interceptor.
    Get { url: String },
    /// Download every resource missing from the live cache.
    Offline,
    /// Compare the live cache with the manifest.
    Status,
}

/// Runs `command` against the manifest at `manifest`.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or the command fails.
pub async fn run(config: AppConfig, manifest: &Path, command: Command) -> crate::Result<()> {
    let build = BuildManifest::load(manifest)?;
    log::info!(
        "Loaded {} resource(s) from {} for {}",
        build.resources.len(),
        manifest.display(),
        config.sync.origin
    );

    match command {
        Command::Sync => run_sync(&config, build).await,
        Command::Get { url } => run_get(&config, build, &url).await,
        Command::Offline => run_offline(&config, build).await,
        Command::Status => run_status(&config, build).await,
    }
}

/// Installs then activates.
async fn run_sync(config: &AppConfig, build: BuildManifest) -> crate::Result<()> {
    let bar = make_progress_bar(build.shell.len(), "install");
    bar.enable_steady_tick(Duration::from_millis(250));
    let progress = Arc::new(BarProgress::new(bar));
    let sync = Synchronizer::open(config, build)?.with_progress(Arc::clone(&progress) as _);

    let installed = sync.install().await;
    progress.finish();
    print_batch("Install", &installed?);

    let report = sync.activate().await?;
    print_activation(&report);
    Ok(())
}

/// Fetches one URL through the interceptor and writes the body to stdout.
async fn run_get(config: &AppConfig, build: BuildManifest, url: &str) -> crate::Result<()> {
    let sync = Synchronizer::open(config, build)?;
    if !sync.attach().await? {
        eprintln!(
            "{} store is not activated for this manifest, requests pass through",
            style("warning:").yellow()
        );
    }

    match sync.handle_fetch(&Request::get(url)).await? {
        FetchOutcome::Passthrough => {
            eprintln!("passthrough");
        }
        FetchOutcome::Respond { response, source } => {
            let source = match source {
                ResponseSource::Cache => style("cache").green(),
                ResponseSource::Network => style("network").cyan(),
            };
            eprintln!("{} {} from {source}", response.status, response.url);
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&response.body).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

/// Sends `downloadOffline` over the control channel.
async fn run_offline(config: &AppConfig, build: BuildManifest) -> crate::Result<()> {
    let sync = Synchronizer::open(config, build)?;
    sync.attach().await?;

    let missing = sync.missing_resources().await?;
    let bar = make_progress_bar(missing.len(), "offline");
    bar.enable_steady_tick(Duration::from_millis(250));
    let progress = Arc::new(BarProgress::new(bar));
    let sync = sync.with_progress(Arc::clone(&progress) as _);

    let result = sync.handle_message("downloadOffline").await;
    progress.finish();
    if let Some(stats) = result? {
        print_batch("Offline Download", &stats);
    }
    Ok(())
}

async fn run_status(config: &AppConfig, build: BuildManifest) -> crate::Result<()> {
    let sync = Synchronizer::open(config, build)?;
    let attached = sync.attach().await?;
    let status = sync.status().await?;
    print_status(&status, attached);
    Ok(())
}
