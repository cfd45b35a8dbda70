//! File-per-record fingerprint cache with an LRU size budget.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use thiserror::Error;

use super::key::{CacheKey, RECORD_EXTENSION};
use super::record::CacheRecord;
use crate::fingerprint::FingerprintResult;

/// Name of the cache directory under the system temporary directory.
pub const CACHE_DIR_NAME: &str = "docsift-cache";

/// Total on-disk budget for all records: 100 MiB.
pub const MAX_CACHE_BYTES: u64 = 100 * 1024 * 1024;

/// Age after which an orphaned temporary write file is swept.
pub const STALE_TMP_AGE: Duration = Duration::from_secs(10 * 60);

const TMP_EXTENSION: &str = "tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors raised inside the cache. Never returned by the public API,
/// which logs them and degrades to "absent" / "not written".
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record could not be parsed or serialised.
    #[error("Corrupt cache record {path}: {source}")]
    Decode {
        /// Record file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for internal cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A record file as seen by eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Absolute path of the record file
    pub path: PathBuf,
    /// Size on disk in bytes
    pub size: u64,
    /// Recency marker (file modification time)
    pub touched: SystemTime,
}

/// Outcome of one [`FingerprintCache::enforce_limit`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Records deleted
    pub evicted: usize,
    /// Bytes released by the deletions
    pub freed_bytes: u64,
    /// Deletions that failed and were skipped
    pub failed: usize,
    /// Orphaned temporary files removed
    pub stale_tmp_removed: usize,
    /// Total record bytes after the pass
    pub total_after: u64,
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of record files
    pub records: usize,
    /// Sum of record file sizes
    pub total_bytes: u64,
    /// Configured budget
    pub budget: u64,
}

/// Persistent key → [`CacheRecord`] store.
///
/// One JSON file per key in a single directory, created lazily. A
/// successful read bumps the file's modification time, which doubles as
/// the LRU recency marker, so no separate index is kept. After every
/// write the total size is brought back under the budget by deleting the
/// least recently touched records. A single record larger than the whole
/// budget is kept; the budget is then exceeded by exactly that excess.
///
/// Construct one per process and share it (`Arc<FingerprintCache>`).
/// Writers to the same key race with last-write-wins per field.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    dir: PathBuf,
    budget: u64,
}

impl FingerprintCache {
    /// Cache rooted at `dir` with the default 100 MiB budget.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            budget: MAX_CACHE_BYTES,
        }
    }

    /// Cache in `<temp dir>/docsift-cache`.
    #[must_use]
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(CACHE_DIR_NAME))
    }

    /// Override the size budget.
    #[must_use]
    pub fn with_budget(mut self, bytes: u64) -> Self {
        self.budget = bytes;
        self
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The size budget in bytes.
    #[must_use]
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// File path of the record for `key`.
    #[must_use]
    pub fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn ensure_dir(&self) -> CacheResult<()> {
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))
    }

    /// Read the record for `key`, refreshing its recency marker.
    ///
    /// Missing, unreadable and corrupt records all read as `None`. A
    /// corrupt record is deleted instead of refreshed.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<CacheRecord> {
        match self.try_get(key) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    fn try_get(&self, key: &CacheKey) -> CacheResult<Option<CacheRecord>> {
        let path = self.record_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        let record = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(source) => {
                if let Err(e) = fs::remove_file(&path) {
                    log::trace!("Could not remove {}: {}", path.display(), e);
                }
                return Err(CacheError::Decode { path, source });
            }
        };

        if let Err(e) = filetime::set_file_mtime(&path, FileTime::now()) {
            log::trace!("Could not touch {}: {}", path.display(), e);
        }
        Ok(Some(record))
    }

    /// Merge `partial` into the stored record for `key` and write it back.
    ///
    /// Fields already stored and absent from `partial` are preserved.
    /// Write failures are logged and swallowed. Always finishes with
    /// [`FingerprintCache::enforce_limit`].
    pub fn set_merged(&self, key: &CacheKey, partial: CacheRecord) {
        self.merge_without_eviction(key, partial);
        self.enforce_limit();
    }

    /// [`FingerprintCache::set_merged`] without the eviction pass.
    ///
    /// For concurrent writers whose caller runs a single
    /// [`FingerprintCache::enforce_limit`] once they have all finished.
    pub(crate) fn merge_without_eviction(&self, key: &CacheKey, partial: CacheRecord) {
        let mut record = self.get(key).unwrap_or_default();
        record.merge(partial);

        if let Err(e) = self.try_write(key, &record) {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    fn try_write(&self, key: &CacheKey, record: &CacheRecord) -> CacheResult<()> {
        self.ensure_dir()?;
        let path = self.record_path(key);
        let json = serde_json::to_vec(record).map_err(|source| CacheError::Decode {
            path: path.clone(),
            source,
        })?;

        let tmp = self.dir.join(format!(
            ".{}.{}.{}.{}",
            key.file_name(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TMP_EXTENSION
        ));
        write_atomically(&tmp, &path, &json)
    }

    /// The cached fingerprint for `key`, if any.
    #[must_use]
    pub fn lookup_fingerprint(&self, key: &CacheKey) -> Option<FingerprintResult> {
        self.get(key).and_then(|record| record.fingerprint())
    }

    /// Store a fingerprint without disturbing other fields of the record.
    pub fn store_fingerprint(&self, key: &CacheKey, result: FingerprintResult) {
        self.set_merged(key, CacheRecord::new().with_fingerprint(result));
    }

    /// All record files with their size and recency marker.
    ///
    /// Temporary files and foreign files are ignored.
    #[must_use]
    pub fn list_records(&self) -> Vec<StoredRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::debug!("Cannot list cache dir {}: {}", self.dir.display(), e);
                }
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let is_record = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == RECORD_EXTENSION);
                if !is_record {
                    return None;
                }
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                Some(StoredRecord {
                    path,
                    size: meta.len(),
                    touched: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                })
            })
            .collect()
    }

    /// Sum of all record file sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.list_records().iter().map(|r| r.size).sum()
    }

    /// Usage snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let records = self.list_records();
        CacheStats {
            records: records.len(),
            total_bytes: records.iter().map(|r| r.size).sum(),
            budget: self.budget,
        }
    }

    /// Delete least recently touched records until the total fits the budget.
    ///
    /// Ties on the recency marker are broken by path. A record that cannot
    /// be deleted is skipped and the next oldest is tried. The last
    /// remaining record is never deleted.
    ///
    /// Temporary files left behind by interrupted writes and older than
    /// [`STALE_TMP_AGE`] are removed first.
    pub fn enforce_limit(&self) -> EvictionReport {
        let stale_tmp_removed = self.sweep_stale_tmp();
        let mut records = self.list_records();
        let mut total: u64 = records.iter().map(|r| r.size).sum();
        let mut report = EvictionReport {
            total_after: total,
            stale_tmp_removed,
            ..Default::default()
        };
        if total <= self.budget {
            return report;
        }

        records.sort_by(|a, b| a.touched.cmp(&b.touched).then_with(|| a.path.cmp(&b.path)));

        let mut remaining = records.len();
        for record in &records {
            if total <= self.budget || remaining <= 1 {
                break;
            }
            match fs::remove_file(&record.path) {
                Ok(()) => {
                    total = total.saturating_sub(record.size);
                    remaining -= 1;
                    report.evicted += 1;
                    report.freed_bytes += record.size;
                    log::trace!("Evicted {}", record.path.display());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    total = total.saturating_sub(record.size);
                    remaining -= 1;
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("Could not evict {}: {}", record.path.display(), e);
                }
            }
        }

        report.total_after = total;
        if report.evicted > 0 {
            log::debug!(
                "Cache eviction: {} records, {} bytes freed, {} bytes remain",
                report.evicted,
                report.freed_bytes,
                total
            );
        }
        report
    }

    fn sweep_stale_tmp(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let now = SystemTime::now();

        entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let path = entry.path();
                let is_tmp = path.extension().and_then(|e| e.to_str()) == Some(TMP_EXTENSION)
                    && entry.file_name().to_string_lossy().starts_with('.');
                if !is_tmp {
                    return false;
                }
                let age = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or(Duration::ZERO);
                if age < STALE_TMP_AGE {
                    return false;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        log::trace!("Removed stale {}", path.display());
                        true
                    }
                    Err(e) => {
                        log::debug!("Could not remove stale {}: {}", path.display(), e);
                        false
                    }
                }
            })
            .count()
    }

    /// Delete every record and leave an empty cache directory.
    ///
    /// Best-effort: returns `false` if anything failed, never panics.
    pub fn clear(&self) -> bool {
        let removed = match fs::remove_dir_all(&self.dir) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                log::warn!("Failed to clear cache {}: {}", self.dir.display(), e);
                false
            }
        };
        match self.ensure_dir() {
            Ok(()) => removed,
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }
}

/// Write `bytes` to `tmp` and rename it onto `path`, so readers never see
/// a torn record. `tmp` is removed when either step fails.
fn write_atomically(tmp: &Path, path: &Path, bytes: &[u8]) -> CacheResult<()> {
    if let Err(e) = fs::write(tmp, bytes) {
        let _ = fs::remove_file(tmp);
        return Err(io_err(tmp)(e));
    }
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(io_err(path)(e));
    }
    Ok(())
}
