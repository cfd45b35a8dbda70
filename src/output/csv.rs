//! CSV output formatter for grouped scan results.
//!
//! One row per document, in similarity order.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number
//! - `fingerprint`: 64-bit fingerprint as 16 hex digits
//! - `method`: `perceptual`, `average` or `unavailable`
//! - `path`: document path
//! - `size`: file size in bytes
//! - `modified`: last modified time (RFC 3339)
//! - `page_count`: number of pages, empty when not measured
//! - `height_over_width`: first page aspect ratio, empty when not measured

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::format_modified;
use crate::raster::PageTable;
use crate::similarity::SortedScan;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    fingerprint: String,
    method: &'a str,
    path: String,
    size: u64,
    modified: String,
    page_count: Option<u32>,
    height_over_width: Option<f64>,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    scan: &'a SortedScan,
    pages: Option<&'a PageTable>,
    only_clusters: bool,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(scan: &'a SortedScan) -> Self {
        Self {
            scan,
            pages: None,
            only_clusters: false,
        }
    }

    /// Fill the page columns from `pages`.
    #[must_use]
    pub fn with_pages(mut self, pages: Option<&'a PageTable>) -> Self {
        self.pages = pages;
        self
    }

    /// Skip groups that contain a single document.
    #[must_use]
    pub fn only_clusters(mut self, only: bool) -> Self {
        self.only_clusters = only;
        self
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, members) in self.scan.groups().enumerate() {
            if self.only_clusters && members.len() < 2 {
                continue;
            }
            for entry in members {
                let info = self.pages.and_then(|table| table.get(&entry.path));
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    fingerprint: entry.fingerprint.to_hex(),
                    method: entry.method.as_str(),
                    path: entry.path.to_string_lossy().into_owned(),
                    size: entry.size,
                    modified: format_modified(entry.modified),
                    page_count: info.map(|i| i.page_count),
                    height_over_width: info.map(|i| i.height_over_width),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
