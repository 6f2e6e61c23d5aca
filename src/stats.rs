//! Statistics for batch fetches and activations.

use std::time::{Duration, Instant};

/// Statistics for one fetch-and-store batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStats {
    /// Number of resources the batch asked for.
    pub requested: usize,
    /// Number of resources written to the cache.
    pub stored: usize,
    /// Total body bytes written.
    pub total_bytes: u64,
    /// Time from the first request to the last write.
    pub elapsed: Duration,
}

impl Default for BatchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchStats {
    /// Creates an empty batch result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requested: 0,
            stored: 0,
            total_bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns true if nothing had to be fetched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.requested == 0
    }

    /// Returns the average throughput in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Accumulates [`BatchStats`] while a batch runs.
#[derive(Debug)]
pub struct BatchStatsBuilder {
    start: Instant,
    requested: usize,
    stored: usize,
    total_bytes: u64,
}

impl BatchStatsBuilder {
    /// Starts timing a batch of `requested` resources.
    #[must_use]
    pub fn new(requested: usize) -> Self {
        Self {
            start: Instant::now(),
            requested,
            stored: 0,
            total_bytes: 0,
        }
    }

    pub const fn add_stored(&mut self, bytes: u64) {
        self.stored += 1;
        self.total_bytes += bytes;
    }

    #[must_use]
    pub fn build(self) -> BatchStats {
        BatchStats {
            requested: self.requested,
            stored: self.stored,
            total_bytes: self.total_bytes,
            elapsed: self.start.elapsed(),
        }
    }
}

/// Which reconciliation path an activation took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No previous manifest: the live cache was rebuilt from staging.
    ColdStart,
    /// A previous manifest was found and diffed against the current one.
    Upgrade,
    /// Reconciliation failed and every cache was deleted.
    Reset(String),
}

/// Summary of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub outcome: ActivationOutcome,
    /// Live entries kept because their fingerprint did not change.
    pub retained: usize,
    /// Live entries deleted as stale or no longer listed.
    pub evicted: usize,
    /// Staged entries copied into the live cache.
    pub promoted: usize,
}

impl ActivationReport {
    #[must_use]
    pub const fn reset(reason: String) -> Self {
        Self {
            outcome: ActivationOutcome::Reset(reason),
            retained: 0,
            evicted: 0,
            promoted: 0,
        }
    }

    #[must_use]
    pub const fn is_reset(&self) -> bool {
        matches!(self.outcome, ActivationOutcome::Reset(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let mut builder = BatchStatsBuilder::new(3);
        builder.add_stored(100);
        builder.add_stored(50);
        let stats = builder.build();

        assert_eq!(stats.requested, 3);
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.total_bytes, 150);
        assert!(!stats.is_empty());
    }

    #[test]
    fn empty_batch() {
        let stats = BatchStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.average_speed(), 0);
    }

    #[test]
    fn average_speed() {
        let stats = BatchStats {
            requested: 1,
            stored: 1,
            total_bytes: 2048,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(stats.average_speed(), 1024);
    }

    #[test]
    fn reset_report() {
        let report = ActivationReport::reset("boom".into());
        assert!(report.is_reset());
        assert_eq!(report.promoted, 0);
    }
}
