//! Human-readable grouped listing.
//!
//! ```text
//! Group 1 (2 documents)
//!   0000000000000000  unavailable  1.2 KiB  /scans/broken.png
//!   0000000000000003  perceptual   3.4 KiB  /scans/invoice.png
//!
//! Group 2 (1 document)
//!   ffffffffffffffff  perceptual   9.9 KiB  /scans/photo.png
//!
//! 3 documents in 2 groups (threshold 8), 1 cached, 2 fingerprinted, 1 unavailable
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use super::ScanSummary;
use crate::similarity::{HashEntry, SortedScan};

/// Text output formatter.
pub struct TextOutput<'a> {
    scan: &'a SortedScan,
    summary: &'a ScanSummary,
    /// Only print groups with more than one member.
    only_clusters: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a text formatter.
    #[must_use]
    pub fn new(scan: &'a SortedScan, summary: &'a ScanSummary) -> Self {
        Self {
            scan,
            summary,
            only_clusters: false,
        }
    }

    /// Skip groups that contain a single document.
    #[must_use]
    pub fn only_clusters(mut self, only: bool) -> Self {
        self.only_clusters = only;
        self
    }

    fn write_entry<W: Write>(writer: &mut W, entry: &HashEntry) -> io::Result<()> {
        let fingerprint = entry.fingerprint.to_hex();
        let fingerprint = if entry.is_valid() {
            fingerprint.cyan()
        } else {
            fingerprint.dim()
        };
        writeln!(
            writer,
            "  {}  {:<11}  {:>10}  {}",
            fingerprint,
            entry.method.as_str(),
            ByteSize::b(entry.size).to_string(),
            entry.path.display()
        )
    }

    /// Write the listing and a summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut shown = 0;
        for (idx, members) in self.scan.groups().enumerate() {
            if self.only_clusters && members.len() < 2 {
                continue;
            }
            if shown > 0 {
                writeln!(writer)?;
            }
            shown += 1;

            let noun = if members.len() == 1 { "document" } else { "documents" };
            writeln!(
                writer,
                "{}",
                format!("Group {} ({} {})", idx + 1, members.len(), noun).bold()
            )?;
            for entry in members {
                Self::write_entry(writer, entry)?;
            }
        }

        if shown > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "{}", self.summary_line())
    }

    /// One-line summary of the scan.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} documents in {} groups (threshold {}), {} cached, {} fingerprinted, {} unavailable",
            self.scan.len(),
            self.scan.grouping().group_count(),
            self.scan.threshold(),
            self.summary.cached,
            self.summary.computed,
            self.summary.unavailable
        );
        if self.summary.thumbnails_rendered > 0 || self.summary.thumbnails_failed > 0 {
            line.push_str(&format!(
                ", {} thumbnails rendered, {} failed",
                self.summary.thumbnails_rendered, self.summary.thumbnails_failed
            ));
        }
        line
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
