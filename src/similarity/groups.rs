//! Threshold grouping over a similarity-sorted sequence.

use std::ops::Range;

use super::{hamming, HashEntry};

/// Indices `i` where a group starts because entry `i - 1` and entry `i`
/// differ in more than `threshold` bits.
///
/// Index `0` is never included.
#[must_use]
pub fn group_boundaries(entries: &[HashEntry], threshold: u32) -> Vec<usize> {
    entries
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            hamming(pair[0].fingerprint.value(), pair[1].fingerprint.value()) > threshold
        })
        .map(|(i, _)| i + 1)
        .collect()
}

/// Partition of a sorted sequence into contiguous groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    threshold: u32,
    ranges: Vec<Range<usize>>,
}

impl Grouping {
    /// Group `entries` (already sorted) at `threshold`.
    #[must_use]
    pub fn compute(entries: &[HashEntry], threshold: u32) -> Self {
        let mut ranges = Vec::new();
        if !entries.is_empty() {
            let mut start = 0;
            for boundary in group_boundaries(entries, threshold) {
                ranges.push(start..boundary);
                start = boundary;
            }
            ranges.push(start..entries.len());
        }
        Self { threshold, ranges }
    }

    /// Threshold this grouping was computed with.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Index ranges of each group, in order.
    #[must_use]
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.ranges.len()
    }
}
