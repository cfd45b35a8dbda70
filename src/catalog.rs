//! Presentation-side state of the most recent scan.
//!
//! The [`Catalog`] owns the sorted, grouped list that is shown to the user.
//! Results are only accepted from a scan token that is still live and
//! newer than whatever was published before, so a slow, superseded scan
//! can never overwrite the output of a newer one.

use std::path::Path;

use crate::orchestrator::ScanToken;
use crate::similarity::{HashEntry, SortedScan, DEFAULT_THRESHOLD};

/// Outcome of [`Catalog::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The entries replaced the catalog contents.
    Accepted,
    /// The token was cancelled or superseded; the entries were discarded.
    Stale,
}

/// Current scan results plus the grouping threshold.
#[derive(Debug, Clone)]
pub struct Catalog {
    scan: SortedScan,
    threshold: u32,
    published_id: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Catalog {
    /// Empty catalog grouping at `threshold`.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            scan: SortedScan::new(Vec::new(), threshold),
            threshold,
            published_id: 0,
        }
    }

    /// Replace the contents with `entries` if `token` is live and newer
    /// than the last published scan.
    pub fn publish(&mut self, token: &ScanToken, entries: Vec<HashEntry>) -> PublishOutcome {
        if !token.is_live() || token.id() <= self.published_id {
            log::debug!(
                "Discarding results of scan {} (last published {})",
                token.id(),
                self.published_id
            );
            return PublishOutcome::Stale;
        }
        self.scan = SortedScan::new(entries, self.threshold);
        self.published_id = token.id();
        PublishOutcome::Accepted
    }

    /// Id of the scan currently shown (0 when nothing was published).
    #[must_use]
    pub fn published_id(&self) -> u64 {
        self.published_id
    }

    /// The sorted, grouped contents.
    #[must_use]
    pub fn scan(&self) -> &SortedScan {
        &self.scan
    }

    /// Entries in similarity order.
    #[must_use]
    pub fn entries(&self) -> &[HashEntry] {
        self.scan.entries()
    }

    /// Current grouping threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Change the threshold and regroup in place without rehashing.
    pub fn set_threshold(&mut self, threshold: u32) {
        if threshold != self.threshold {
            self.threshold = threshold;
            self.scan.regroup(threshold);
        }
    }

    /// Drop entries for paths that no longer exist (e.g. moved to trash).
    pub fn remove_paths(&mut self, removed: &[&Path]) -> usize {
        self.scan.remove_paths(removed)
    }

    /// Forget everything, e.g. after the cache was cleared and before a rescan.
    pub fn clear(&mut self) {
        self.scan = SortedScan::new(Vec::new(), self.threshold);
    }
}
