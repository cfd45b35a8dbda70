//! Output formatters for grouped scan results.
//!
//! This module renders a [`SortedScan`](crate::similarity::SortedScan)
//! for the command line:
//! - [`text`]: grouped, optionally coloured listing for people
//! - [`json`]: machine-readable document for scripting
//! - [`csv`]: one row per document for spreadsheets
//!
//! # Example
//!
//! ```
//! use docsift::output::{JsonOutput, ScanSummary};
//! use docsift::similarity::SortedScan;
//!
//! let scan = SortedScan::new(Vec::new(), 8);
//! let output = JsonOutput::new(&scan, &ScanSummary::default(), None);
//! assert!(output.to_json().unwrap().starts_with('{'));
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

pub use self::csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;

/// Statistics of one scan run, shown next to the groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Folder that was scanned
    pub folder: PathBuf,
    /// Documents listed
    pub documents: usize,
    /// Fingerprints served from the cache
    pub cached: usize,
    /// Fingerprints computed
    pub computed: usize,
    /// Documents without a usable fingerprint
    pub unavailable: usize,
    /// Thumbnails rendered in this run (when requested)
    pub thumbnails_rendered: usize,
    /// Thumbnails that failed to render (when requested)
    pub thumbnails_failed: usize,
    /// Wall-clock duration of the scan
    pub duration: Duration,
}

/// RFC 3339 rendering of a modification time.
pub(crate) fn format_modified(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.to_rfc3339()
}
