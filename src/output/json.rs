//! JSON output formatter for grouped scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "id": 1,
//!       "documents": [
//!         {
//!           "path": "/scans/a.png",
//!           "fingerprint": "8f3c0000a1b2c3d4",
//!           "method": "perceptual",
//!           "valid": true,
//!           "size": 1024,
//!           "modified": "2024-05-01T10:00:00+00:00",
//!           "page_count": 3,
//!           "height_over_width": 1.414
//!         }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "folder": "/scans",
//!     "documents": 1,
//!     "groups": 1,
//!     "threshold": 8,
//!     "cached": 0,
//!     "computed": 1,
//!     "unavailable": 0,
//!     "scan_duration_ms": 12
//!   }
//! }
//! ```
//!
//! `page_count` and `height_over_width` are only present when page
//! information was measured for the scan.

use std::io::Write;

use serde::Serialize;

use super::{format_modified, ScanSummary};
use crate::fingerprint::Method;
use crate::raster::PageTable;
use crate::similarity::{HashEntry, SortedScan};

/// One document in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDocument {
    /// Document path
    pub path: String,
    /// Fingerprint as 16 hex digits
    pub fingerprint: String,
    /// Fingerprint algorithm
    pub method: Method,
    /// Whether the fingerprint reflects page content
    pub valid: bool,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (RFC 3339)
    pub modified: String,
    /// Number of pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// First page height divided by width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_over_width: Option<f64>,
}

impl JsonDocument {
    /// Convert a sorted entry, attaching its page information when known.
    #[must_use]
    pub fn from_entry(entry: &HashEntry, pages: Option<&PageTable>) -> Self {
        let info = pages.and_then(|table| table.get(&entry.path));
        Self {
            path: entry.path.to_string_lossy().into_owned(),
            fingerprint: entry.fingerprint.to_hex(),
            method: entry.method,
            valid: entry.is_valid(),
            size: entry.size,
            modified: format_modified(entry.modified),
            page_count: info.map(|i| i.page_count),
            height_over_width: info.map(|i| i.height_over_width),
        }
    }
}

/// One group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// 1-based group number in similarity order
    pub id: usize,
    /// Members in similarity order
    pub documents: Vec<JsonDocument>,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Scanned folder
    pub folder: String,
    /// Documents listed
    pub documents: usize,
    /// Groups at the threshold
    pub groups: usize,
    /// Grouping threshold in bits
    pub threshold: u32,
    /// Fingerprints served from the cache
    pub cached: usize,
    /// Fingerprints computed
    pub computed: usize,
    /// Documents without a usable fingerprint
    pub unavailable: usize,
    /// Thumbnails rendered
    pub thumbnails_rendered: usize,
    /// Thumbnails that failed
    pub thumbnails_failed: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Groups in similarity order
    pub groups: Vec<JsonGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON document for a grouped scan.
    #[must_use]
    pub fn new(scan: &SortedScan, summary: &ScanSummary, pages: Option<&PageTable>) -> Self {
        let groups: Vec<JsonGroup> = scan
            .groups()
            .enumerate()
            .map(|(idx, members)| JsonGroup {
                id: idx + 1,
                documents: members
                    .iter()
                    .map(|entry| JsonDocument::from_entry(entry, pages))
                    .collect(),
            })
            .collect();

        Self {
            summary: JsonSummary {
                folder: summary.folder.to_string_lossy().into_owned(),
                documents: summary.documents,
                groups: groups.len(),
                threshold: scan.threshold(),
                cached: summary.cached,
                computed: summary.computed,
                unavailable: summary.unavailable,
                thumbnails_rendered: summary.thumbnails_rendered,
                thumbnails_failed: summary.thumbnails_failed,
                scan_duration_ms: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            },
            groups,
        }
    }

    /// Drop groups that contain a single document.
    ///
    /// Remaining groups keep their ids and the summary still counts every
    /// group at the threshold.
    #[must_use]
    pub fn only_clusters(mut self, only: bool) -> Self {
        if only {
            self.groups.retain(|g| g.documents.len() > 1);
        }
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
