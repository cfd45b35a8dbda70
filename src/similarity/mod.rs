//! Similarity ordering and grouping of fingerprinted documents.
//!
//! # Overview
//!
//! Documents are sorted by the unsigned value of their fingerprint, which
//! tends to place visually similar pages next to each other, and the sorted
//! sequence is then cut into groups wherever two neighbours are further
//! apart than a Hamming-distance threshold.
//!
//! Grouping depends only on the sorted order and the threshold, so
//! changing the threshold re-groups an existing [`SortedScan`] without
//! touching any fingerprint.
//!
//! # Example
//!
//! ```
//! use docsift::fingerprint::{Fingerprint, Method};
//! use docsift::similarity::{HashEntry, SortedScan};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let entry = |name: &str, fp: u64| HashEntry {
//!     path: PathBuf::from(name),
//!     fingerprint: Fingerprint::new(fp),
//!     method: Method::Perceptual,
//!     size: 10,
//!     modified: SystemTime::UNIX_EPOCH,
//! };
//!
//! let scan = SortedScan::new(
//!     vec![entry("c", u64::MAX), entry("b", 3), entry("a", 1)],
//!     8,
//! );
//! assert_eq!(scan.grouping().group_count(), 2);
//! ```

pub mod groups;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fingerprint::{Fingerprint, FingerprintResult, Method};
use crate::scanner::DocumentMeta;

pub use groups::{group_boundaries, Grouping};

/// Default grouping threshold in bits.
pub const DEFAULT_THRESHOLD: u32 = 8;

/// A fingerprinted document, as sorted and grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    /// Document path
    pub path: PathBuf,
    /// First-page fingerprint (`0` when unavailable)
    pub fingerprint: Fingerprint,
    /// How the fingerprint was obtained
    pub method: Method,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl HashEntry {
    /// Pair a listed document with its fingerprint.
    #[must_use]
    pub fn new(meta: &DocumentMeta, result: FingerprintResult) -> Self {
        Self {
            path: meta.path.clone(),
            fingerprint: result.value,
            method: result.method,
            size: meta.size,
            modified: meta.modified,
        }
    }

    /// Whether the fingerprint reflects actual page content.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.method != Method::Unavailable
    }
}

/// Hamming distance between two raw fingerprints.
#[must_use]
pub const fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Total order used for similarity sorting.
///
/// Fingerprint ascending, then size, then modification time. Path breaks
/// any remaining tie so the order is fully deterministic.
#[must_use]
pub fn compare_entries(a: &HashEntry, b: &HashEntry) -> Ordering {
    a.fingerprint
        .cmp(&b.fingerprint)
        .then(a.size.cmp(&b.size))
        .then(a.modified.cmp(&b.modified))
        .then_with(|| a.path.cmp(&b.path))
}

/// Sort entries in place by [`compare_entries`].
pub fn sort_entries(entries: &mut [HashEntry]) {
    entries.sort_by(compare_entries);
}

/// A sorted batch of entries together with its current grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedScan {
    entries: Vec<HashEntry>,
    grouping: Grouping,
}

impl SortedScan {
    /// Sort `entries` and group them at `threshold`.
    #[must_use]
    pub fn new(mut entries: Vec<HashEntry>, threshold: u32) -> Self {
        sort_entries(&mut entries);
        let grouping = Grouping::compute(&entries, threshold);
        Self { entries, grouping }
    }

    /// Entries in similarity order.
    #[must_use]
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// The current grouping.
    #[must_use]
    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    /// Threshold the current grouping was computed with.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.grouping.threshold()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over groups as slices of the sorted entries.
    pub fn groups(&self) -> impl Iterator<Item = &[HashEntry]> + '_ {
        self.grouping
            .ranges()
            .iter()
            .map(move |range| &self.entries[range.clone()])
    }

    /// Recompute the grouping for a new threshold. Order is unchanged.
    pub fn regroup(&mut self, threshold: u32) {
        self.grouping = Grouping::compute(&self.entries, threshold);
    }

    /// Drop entries whose path is in `removed`, keeping order, and regroup.
    ///
    /// Returns the number of entries dropped.
    pub fn remove_paths(&mut self, removed: &[&Path]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !removed.iter().any(|p| *p == entry.path.as_path()));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            self.regroup(self.grouping.threshold());
        }
        dropped
    }
}
