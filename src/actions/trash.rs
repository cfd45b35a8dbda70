//! Moving documents to the platform trash.
//!
//! Every path is attempted independently; one failure never stops the
//! rest of the batch. The outcome of each path is reported in a
//! [`TrashReport`].
//!
//! # Example
//!
//! ```no_run
//! use docsift::actions::trash_paths;
//! use std::path::PathBuf;
//!
//! let report = trash_paths(&[PathBuf::from("/scans/copy-of-invoice.png")]);
//! if !report.ok {
//!     for failure in report.failures() {
//!         eprintln!("{}: {}", failure.path.display(), failure.error.as_deref().unwrap_or("?"));
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ActionError;

/// Outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashResult {
    /// The path that was trashed (or not)
    pub path: PathBuf,
    /// Whether it was moved to the trash
    pub ok: bool,
    /// Failure description when `ok` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a batch trash operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashReport {
    /// True iff every path was trashed (vacuously true for no paths)
    pub ok: bool,
    /// Per-path results, in input order
    pub results: Vec<TrashResult>,
}

impl TrashReport {
    /// Paths that were moved to the trash.
    pub fn trashed(&self) -> impl Iterator<Item = &Path> + '_ {
        self.results.iter().filter(|r| r.ok).map(|r| r.path.as_path())
    }

    /// Results that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TrashResult> + '_ {
        self.results.iter().filter(|r| !r.ok)
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        let moved = self.results.len() - failed;
        if failed == 0 {
            format!("Moved {} file(s) to trash", moved)
        } else {
            format!("Moved {} file(s) to trash, {} failed", moved, failed)
        }
    }
}

/// Move one file to the trash.
///
/// # Errors
///
/// Returns [`ActionError::NotFound`] for a missing path and
/// [`ActionError::TrashFailed`] when the platform trash refuses it.
pub fn trash_path(path: &Path) -> Result<(), ActionError> {
    fs::symlink_metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ActionError::NotFound(path.to_path_buf()),
        _ => ActionError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        ActionError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {}", path.display());
    Ok(())
}

/// Move every path to the trash, collecting per-path results.
#[must_use]
pub fn trash_paths(paths: &[PathBuf]) -> TrashReport {
    let results: Vec<TrashResult> = paths
        .iter()
        .map(|path| match trash_path(path) {
            Ok(()) => TrashResult {
                path: path.clone(),
                ok: true,
                error: None,
            },
            Err(e) => TrashResult {
                path: path.clone(),
                ok: false,
                error: Some(e.to_string()),
            },
        })
        .collect();

    TrashReport {
        ok: results.iter().all(|r| r.ok),
        results,
    }
}
