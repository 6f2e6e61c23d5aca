//! Progress bar and summary reporting for CLI runs.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    ActivationOutcome, ActivationReport, BatchStats, CacheStatus, SyncProgress, format_bytes,
    format_duration,
};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar counting fetched resources.
pub fn make_progress_bar(len: usize, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let template = format!("{label:>8} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} - {{msg}}");
    bar.set_style(
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━━╌"),
    );
    bar
}

/// Renders [`SyncProgress`] events on a progress bar.
///
/// Only resources announced through `on_fetch_start` advance the bar, so
/// entries promoted during activation are not counted twice.
pub struct BarProgress {
    bar: ProgressBar,
    pending: Mutex<HashSet<String>>,
}

impl BarProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn take_pending(&self, url: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
    }
}

impl SyncProgress for BarProgress {
    fn on_fetch_start(&self, url: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());
        self.bar.set_message(url.to_string());
    }

    fn on_stored(&self, url: &str, bytes: u64) {
        if self.take_pending(url) {
            self.bar.inc(1);
            self.bar
                .println(format!("  {url} ({})", format_bytes(bytes)));
        }
    }

    fn on_evicted(&self, url: &str) {
        self.bar
            .println(format!("  {} {url}", style("evicted").yellow()));
    }

    fn on_error(&self, url: &str, error: &str) {
        self.take_pending(url);
        self.bar
            .println(format!("  {} {url}: {error}", style("failed").red()));
    }
}

/// Prints a summary of one fetch batch.
pub fn print_batch(title: &str, stats: &BatchStats) {
    println!("\n{SEPARATOR}");
    println!("{}", style(title).bold());
    println!("{SEPARATOR}");

    if stats.is_empty() {
        println!("  Nothing to fetch.");
    } else {
        println!("  Resources stored:  {}/{}", stats.stored, stats.requested);
        println!("  Total size:        {}", format_bytes(stats.total_bytes));
        println!("  Total time:        {}", format_duration(stats.elapsed));
        println!(
            "  Average speed:     {}/s",
            format_bytes(stats.average_speed())
        );
    }

    println!("{SEPARATOR}");
}

/// Prints the result of an activation.
pub fn print_activation(report: &ActivationReport) {
    println!("\n{SEPARATOR}");
    println!("{}", style("Activation").bold());
    println!("{SEPARATOR}");

    match &report.outcome {
        ActivationOutcome::ColdStart => println!("  Outcome:           cold start"),
        ActivationOutcome::Upgrade => println!("  Outcome:           upgrade"),
        ActivationOutcome::Reset(reason) => {
            println!("  Outcome:           {}", style("reset").red().bold());
            println!("  Reason:            {reason}");
        }
    }
    if !report.is_reset() {
        println!("  Retained:          {}", report.retained);
        println!("  Evicted:           {}", report.evicted);
        println!("  Promoted:          {}", report.promoted);
    }

    println!("{SEPARATOR}");
}

/// Prints how the live cache compares with the manifest.
pub fn print_status(status: &CacheStatus, attached: bool) {
    println!("{SEPARATOR}");
    println!("{}", style("Cache Status").bold());
    println!("{SEPARATOR}");

    let total = status.cached + status.missing.len();
    println!("  Cached:            {}/{total}", status.cached);
    if status.unlisted > 0 {
        println!("  Unlisted entries:  {}", status.unlisted);
    }
    let snapshot = if status.snapshot_current {
        style("current").green()
    } else {
        style("stale").yellow()
    };
    println!("  Snapshot:          {snapshot}");
    if !attached {
        println!("  Run `asset-sync sync` to activate this manifest.");
    }

    if !status.missing.is_empty() {
        println!("{SEPARATOR}");
        println!("Missing:");
        for key in &status.missing {
            println!("  {key}");
        }
    }

    println!("{SEPARATOR}");
}
