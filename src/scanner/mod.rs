//! Scanner module for document discovery.
//!
//! Lists the documents of a single folder (no recursion) whose extension
//! matches one of a given set, returning the identity metadata the
//! fingerprint cache keys on.
//!
//! # Example
//!
//! ```no_run
//! use docsift::scanner::list_documents;
//! use std::path::Path;
//!
//! let docs = list_documents(Path::new("./scans"), &["png", "tiff"]).unwrap();
//! for doc in &docs {
//!     println!("{}: {} bytes", doc.path.display(), doc.size);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

/// Identity metadata of one listed document.
///
/// Immutable for the lifetime of a folder scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Path to the document (unique within a scan)
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl DocumentMeta {
    /// Create a new DocumentMeta.
    #[must_use]
    pub fn new(path: PathBuf, modified: SystemTime, size: u64) -> Self {
        Self {
            path,
            modified,
            size,
        }
    }

    /// Modification time as signed nanoseconds relative to the Unix epoch.
    #[must_use]
    pub fn modified_nanos(&self) -> i128 {
        match self.modified.duration_since(UNIX_EPOCH) {
            Ok(after) => i128::try_from(after.as_nanos()).unwrap_or(i128::MAX),
            Err(before) => -i128::try_from(before.duration().as_nanos()).unwrap_or(i128::MAX),
        }
    }
}

/// Errors that can occur while listing a folder.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission was denied when accessing the directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// List the files directly inside `dir` whose extension is in `extensions`.
///
/// Matching is case-insensitive and extensions are given without the dot.
/// Subdirectories are not entered and symlinks are not followed. Entries
/// that cannot be stat-ed are skipped with a warning. The result is sorted
/// by path.
///
/// # Errors
///
/// Returns a [`ScanError`] if `dir` is missing, not a directory, or
/// cannot be read.
pub fn list_documents(dir: &Path, extensions: &[&str]) -> Result<Vec<DocumentMeta>, ScanError> {
    let meta = std::fs::metadata(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(dir.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(dir.to_path_buf()),
        _ => ScanError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        log::trace!("Found {}", entry.path().display());
        documents.push(DocumentMeta::new(
            entry.into_path(),
            modified,
            metadata.len(),
        ));
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    log::debug!("Listed {} documents in {}", documents.len(), dir.display());
    Ok(documents)
}
