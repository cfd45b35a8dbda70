//! Batch orchestration of fingerprinting and thumbnail rendering.
//!
//! # Overview
//!
//! [`BatchOrchestrator`] drives two passes over a folder listing:
//!
//! 1. **Hashing** ([`BatchOrchestrator::hash_and_sort`]): each document is
//!    looked up in the [`FingerprintCache`]; on a miss its first page is
//!    rendered and fingerprinted and the result written back. Documents
//!    are processed in micro-batches of [`HASH_BATCH_SIZE`] with a yield
//!    between batches. The result is returned in similarity order.
//! 2. **Thumbnails** ([`BatchOrchestrator::render_thumbnails`]): batches of
//!    `concurrency` documents are rendered on a dedicated worker pool of
//!    the same size; the orchestrator yields between batches. Workers
//!    write to the cache without evicting and a single eviction pass runs
//!    after each batch.
//! 3. **Page information** ([`BatchOrchestrator::page_info`]): page count
//!    and first-page aspect ratio for each document, for the JSON and CSV
//!    listings. Page counts already cached by the thumbnail pass are reused.
//!
//! # Cancellation
//!
//! Both passes take a [`ScanToken`] and check it before and after every
//! cache lookup, render and yield. Once the token is no longer live the
//! pass stops and returns an empty outcome flagged `cancelled`. Cache
//! writes already started are allowed to finish.

pub mod token;

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use rayon::prelude::*;

use crate::cache::{CacheKey, CacheRecord, FingerprintCache};
use crate::fingerprint::fingerprint_document;
use crate::progress::{ProgressCallback, PHASE_HASHING, PHASE_THUMBNAILS};
use crate::raster::{PageInfo, PageTable, Rasterizer};
use crate::scanner::DocumentMeta;
use crate::similarity::{sort_entries, HashEntry};

pub use token::{ScanController, ScanToken};

/// Documents fingerprinted between cooperative yields.
pub const HASH_BATCH_SIZE: usize = 12;

/// Default number of thumbnails rendered at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Thumbnail bounding box width in pixels.
pub const THUMBNAIL_WIDTH: u32 = 100;

/// Thumbnail bounding box height in pixels.
pub const THUMBNAIL_HEIGHT: u32 = 140;

/// Prefix of the `data:` URL thumbnails are stored as.
pub const THUMBNAIL_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Result of a hashing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashOutcome {
    /// Entries in similarity order (empty when cancelled)
    pub entries: Vec<HashEntry>,
    /// Fingerprints served from the cache
    pub cached: usize,
    /// Fingerprints computed from a fresh render
    pub computed: usize,
    /// Documents without a usable fingerprint
    pub unavailable: usize,
    /// The scan was superseded or cancelled before finishing
    pub cancelled: bool,
}

impl HashOutcome {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }
}

/// Rendered (or cached) thumbnail of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Document path
    pub path: std::path::PathBuf,
    /// PNG `data:` URL, `None` when the page could not be rendered
    pub data_url: Option<String>,
    /// Page count (`1` when unknown)
    pub page_count: u32,
    /// Whether the thumbnail came from the cache
    pub from_cache: bool,
}

/// Result of a thumbnail pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailOutcome {
    /// One thumbnail per input document, in input order (empty when cancelled)
    pub thumbnails: Vec<Thumbnail>,
    /// Thumbnails served from the cache
    pub cached: usize,
    /// Thumbnails freshly rendered
    pub rendered: usize,
    /// Documents that could not be rendered
    pub failed: usize,
    /// The scan was superseded or cancelled before finishing
    pub cancelled: bool,
}

/// Schedules fingerprinting and thumbnail work for a batch of documents.
#[derive(Clone)]
pub struct BatchOrchestrator {
    rasterizer: Arc<dyn Rasterizer>,
    cache: Option<Arc<FingerprintCache>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    concurrency: usize,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("cache", &self.cache.as_ref().map(|c| c.dir().to_path_buf()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    /// Create an orchestrator with no cache and the default concurrency.
    #[must_use]
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            rasterizer,
            cache: None,
            progress_callback: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Use `cache` for fingerprint and thumbnail lookups.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<FingerprintCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Thumbnail batch size and worker count (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Configured thumbnail concurrency.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fingerprint every document and return them in similarity order.
    ///
    /// Cache hits skip rendering. Misses are rendered, fingerprinted and
    /// written back, unavailable fingerprints included, so broken
    /// documents are not retried on every scan.
    #[must_use]
    pub fn hash_and_sort(&self, documents: &[DocumentMeta], token: &ScanToken) -> HashOutcome {
        if !token.is_live() {
            return HashOutcome::cancelled();
        }
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_HASHING, documents.len());
        }
        log::info!("Fingerprinting {} documents", documents.len());

        let mut outcome = HashOutcome::default();
        let mut processed = 0;

        for batch in documents.chunks(HASH_BATCH_SIZE) {
            for meta in batch {
                if !token.is_live() {
                    return self.abandon_hashing(token);
                }

                let key = CacheKey::for_document(meta);
                let cached = self.cache.as_ref().and_then(|c| c.lookup_fingerprint(&key));
                if !token.is_live() {
                    return self.abandon_hashing(token);
                }

                let result = match cached {
                    Some(result) => {
                        log::trace!("Fingerprint cache hit: {}", meta.path.display());
                        outcome.cached += 1;
                        result
                    }
                    None => {
                        let result = fingerprint_document(self.rasterizer.as_ref(), &meta.path);
                        if let Some(ref cache) = self.cache {
                            cache.store_fingerprint(&key, result);
                        }
                        if !token.is_live() {
                            return self.abandon_hashing(token);
                        }
                        outcome.computed += 1;
                        result
                    }
                };

                if !result.is_valid() {
                    outcome.unavailable += 1;
                }
                outcome.entries.push(HashEntry::new(meta, result));

                processed += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(processed, meta.path.to_string_lossy().as_ref());
                    callback.on_item_completed(meta.size);
                }
            }

            std::thread::yield_now();
            if !token.is_live() {
                return self.abandon_hashing(token);
            }
        }

        sort_entries(&mut outcome.entries);
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }
        log::debug!(
            "Scan {}: {} cached, {} computed, {} unavailable",
            token.id(),
            outcome.cached,
            outcome.computed,
            outcome.unavailable
        );
        outcome
    }

    fn abandon_hashing(&self, token: &ScanToken) -> HashOutcome {
        log::debug!("Scan {} abandoned during hashing", token.id());
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }
        HashOutcome::cancelled()
    }

    /// Produce a thumbnail for every document.
    ///
    /// Runs batches of [`BatchOrchestrator::concurrency`] documents on a
    /// worker pool of that size. Thumbnails and page counts are merged into
    /// the cache record next to any stored fingerprint.
    #[must_use]
    pub fn render_thumbnails(
        &self,
        documents: &[DocumentMeta],
        token: &ScanToken,
    ) -> ThumbnailOutcome {
        let cancelled = ThumbnailOutcome {
            cancelled: true,
            ..Default::default()
        };
        if !token.is_live() {
            return cancelled;
        }
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_THUMBNAILS, documents.len());
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create thumbnail pool, rendering sequentially: {}", e);
                None
            }
        };

        let done = AtomicUsize::new(0);
        let mut outcome = ThumbnailOutcome::default();

        for batch in documents.chunks(self.concurrency) {
            let render_batch = || -> Vec<Option<Thumbnail>> {
                batch
                    .par_iter()
                    .map(|meta| {
                        let thumb = self.thumbnail_for(meta, token);
                        if thumb.is_some() {
                            if let Some(ref callback) = self.progress_callback {
                                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                                callback.on_progress(n, meta.path.to_string_lossy().as_ref());
                            }
                        }
                        thumb
                    })
                    .collect()
            };
            let results = match pool {
                Some(ref pool) => pool.install(render_batch),
                None => render_batch(),
            };

            if let Some(ref cache) = self.cache {
                cache.enforce_limit();
            }

            for result in results {
                let Some(thumb) = result else {
                    return self.abandon_thumbnails(token, cancelled);
                };
                if thumb.from_cache {
                    outcome.cached += 1;
                } else if thumb.data_url.is_some() {
                    outcome.rendered += 1;
                } else {
                    outcome.failed += 1;
                }
                outcome.thumbnails.push(thumb);
            }

            std::thread::yield_now();
            if !token.is_live() {
                return self.abandon_thumbnails(token, cancelled);
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_THUMBNAILS);
        }
        log::debug!(
            "Scan {}: {} thumbnails cached, {} rendered, {} failed",
            token.id(),
            outcome.cached,
            outcome.rendered,
            outcome.failed
        );
        outcome
    }

    fn abandon_thumbnails(&self, token: &ScanToken, empty: ThumbnailOutcome) -> ThumbnailOutcome {
        log::debug!("Scan {} abandoned during thumbnails", token.id());
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_THUMBNAILS);
        }
        empty
    }

    /// Page count and aspect ratio of every document.
    ///
    /// Returns `None` when the token dies before the pass finishes.
    #[must_use]
    pub fn page_info(&self, documents: &[DocumentMeta], token: &ScanToken) -> Option<PageTable> {
        let mut table = PageTable::with_capacity(documents.len());
        for batch in documents.chunks(HASH_BATCH_SIZE) {
            for meta in batch {
                if !token.is_live() {
                    log::debug!("Scan {} abandoned during page measurement", token.id());
                    return None;
                }
                let cached = self.cache.as_ref().and_then(|cache| {
                    cache
                        .get(&CacheKey::for_document(meta))
                        .and_then(|record| record.page_count())
                });
                let info = match cached {
                    Some(page_count) => PageInfo {
                        page_count,
                        height_over_width: self.rasterizer.height_over_width(&meta.path),
                    },
                    None => PageInfo::measure(self.rasterizer.as_ref(), &meta.path),
                };
                table.insert(meta.path.clone(), info);
            }
            std::thread::yield_now();
        }
        token.is_live().then_some(table)
    }

    /// Thumbnail for one document, or `None` if the token died meanwhile.
    fn thumbnail_for(&self, meta: &DocumentMeta, token: &ScanToken) -> Option<Thumbnail> {
        if !token.is_live() {
            return None;
        }
        let key = CacheKey::for_document(meta);
        let record = self.cache.as_ref().and_then(|c| c.get(&key));
        if !token.is_live() {
            return None;
        }

        if let Some(ref record) = record {
            if let Some(data_url) = record.thumbnail() {
                log::trace!("Thumbnail cache hit: {}", meta.path.display());
                return Some(Thumbnail {
                    path: meta.path.clone(),
                    data_url: Some(data_url.to_string()),
                    page_count: record
                        .page_count()
                        .unwrap_or_else(|| self.rasterizer.page_count(&meta.path)),
                    from_cache: true,
                });
            }
        }

        let image = self
            .rasterizer
            .render(&meta.path, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT);
        if !token.is_live() {
            return None;
        }
        let page_count = self.rasterizer.page_count(&meta.path);
        let data_url = image.as_ref().and_then(|img| encode_data_url(img, meta));

        if let (Some(cache), Some(url)) = (self.cache.as_ref(), data_url.as_ref()) {
            cache.merge_without_eviction(
                &key,
                CacheRecord::new()
                    .with_thumbnail(url.clone())
                    .with_page_count(page_count),
            );
        }

        Some(Thumbnail {
            path: meta.path.clone(),
            data_url,
            page_count,
            from_cache: false,
        })
    }
}

/// Encode a rendered page as a PNG `data:` URL.
fn encode_data_url(image: &image::DynamicImage, meta: &DocumentMeta) -> Option<String> {
    let mut png = Vec::new();
    match image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
        Ok(()) => Some(format!("{}{}", THUMBNAIL_DATA_URL_PREFIX, STANDARD.encode(&png))),
        Err(e) => {
            log::debug!("Failed to encode thumbnail for {}: {}", meta.path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Method;
    use crate::raster::ImageRasterizer;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn write_page(dir: &Path, name: &str, period: u32) -> DocumentMeta {
        let path = dir.join(name);
        let mut img = RgbImage::new(80, 110);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = if ((x / period) + (y / period)) % 2 == 0 { 230 } else { 25 };
            *px = Rgb([v, v, v]);
        }
        img.save(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        DocumentMeta::new(path, meta.modified().unwrap(), meta.len())
    }

    fn orchestrator(cache_dir: &Path) -> (BatchOrchestrator, Arc<FingerprintCache>) {
        let cache = Arc::new(FingerprintCache::new(cache_dir));
        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()))
            .with_cache(Arc::clone(&cache));
        (orch, cache)
    }

    #[test]
    fn test_hash_and_sort_populates_cache() {
        let docs_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let docs = vec![
            write_page(docs_dir.path(), "a.png", 5),
            write_page(docs_dir.path(), "b.png", 17),
        ];
        let (orch, cache) = orchestrator(cache_dir.path());

        let first = orch.hash_and_sort(&docs, &ScanToken::detached());
        assert!(!first.cancelled);
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.computed, 2);
        assert_eq!(first.cached, 0);
        assert_eq!(cache.stats().records, 2);

        let second = orch.hash_and_sort(&docs, &ScanToken::detached());
        assert_eq!(second.cached, 2);
        assert_eq!(second.entries, first.entries);
    }

    #[test]
    fn test_broken_document_is_unavailable() {
        let docs_dir = tempdir().unwrap();
        let path = docs_dir.path().join("broken.png");
        std::fs::write(&path, b"nope").unwrap();
        let doc = DocumentMeta::new(path, SystemTime::UNIX_EPOCH, 4);

        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
        let outcome = orch.hash_and_sort(&[doc], &ScanToken::detached());
        assert_eq!(outcome.unavailable, 1);
        assert_eq!(outcome.entries[0].method, Method::Unavailable);
        assert!(outcome.entries[0].fingerprint.is_zero());
    }

    #[test]
    fn test_cancelled_token_returns_nothing() {
        let docs_dir = tempdir().unwrap();
        let docs = vec![write_page(docs_dir.path(), "a.png", 5)];
        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
        let token = ScanToken::detached();
        token.cancel();

        let hashed = orch.hash_and_sort(&docs, &token);
        assert!(hashed.cancelled);
        assert!(hashed.entries.is_empty());

        let thumbs = orch.render_thumbnails(&docs, &token);
        assert!(thumbs.cancelled);
        assert!(thumbs.thumbnails.is_empty());
    }

    #[test]
    fn test_render_thumbnails_then_cache_hit() {
        let docs_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let docs: Vec<_> = (0..5)
            .map(|i| write_page(docs_dir.path(), &format!("p{i}.png"), 3 + i))
            .collect();
        let (orch, cache) = orchestrator(cache_dir.path());
        let orch = orch.with_concurrency(2);

        let first = orch.render_thumbnails(&docs, &ScanToken::detached());
        assert_eq!(first.thumbnails.len(), 5);
        assert_eq!(first.rendered, 5);
        for (thumb, doc) in first.thumbnails.iter().zip(&docs) {
            assert_eq!(thumb.path, doc.path);
            assert_eq!(thumb.page_count, 1);
            assert!(thumb
                .data_url
                .as_deref()
                .unwrap()
                .starts_with(THUMBNAIL_DATA_URL_PREFIX));
        }

        let second = orch.render_thumbnails(&docs, &ScanToken::detached());
        assert_eq!(second.cached, 5);
        assert!(second.thumbnails.iter().all(|t| t.from_cache));

        // Fingerprinting afterwards keeps the thumbnail fields.
        let _ = orch.hash_and_sort(&docs, &ScanToken::detached());
        let record = cache.get(&CacheKey::for_document(&docs[0])).unwrap();
        assert!(record.thumbnail().is_some());
        assert!(record.fingerprint().is_some());
    }

    #[test]
    fn test_thumbnail_fits_box() {
        let docs_dir = tempdir().unwrap();
        let doc = write_page(docs_dir.path(), "tall.png", 4);
        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
        let outcome = orch.render_thumbnails(&[doc], &ScanToken::detached());

        let url = outcome.thumbnails[0].data_url.as_deref().unwrap();
        let png = STANDARD
            .decode(url.trim_start_matches(THUMBNAIL_DATA_URL_PREFIX))
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert!(img.width() <= THUMBNAIL_WIDTH);
        assert!(img.height() <= THUMBNAIL_HEIGHT);
    }

    #[test]
    fn test_thumbnail_batches_respect_budget() {
        let docs_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let docs: Vec<_> = (0..4)
            .map(|i| write_page(docs_dir.path(), &format!("p{i}.png"), 3 + i))
            .collect();
        let cache = Arc::new(FingerprintCache::new(cache_dir.path()).with_budget(1));
        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()))
            .with_cache(Arc::clone(&cache))
            .with_concurrency(4);

        let outcome = orch.render_thumbnails(&docs, &ScanToken::detached());
        assert_eq!(outcome.rendered, 4);
        assert_eq!(cache.stats().records, 1);
    }

    #[test]
    fn test_page_info_measures_every_document() {
        let docs_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let docs = vec![
            write_page(docs_dir.path(), "a.png", 5),
            write_page(docs_dir.path(), "b.png", 9),
        ];
        let (orch, cache) = orchestrator(cache_dir.path());

        let table = orch.page_info(&docs, &ScanToken::detached()).unwrap();
        assert_eq!(table.len(), 2);
        let info = table[&docs[0].path];
        assert_eq!(info.page_count, 1);
        assert!((info.height_over_width - 110.0 / 80.0).abs() < 1e-9);

        // Cached page counts win over a fresh measurement.
        cache.set_merged(
            &CacheKey::for_document(&docs[1]),
            CacheRecord::new().with_page_count(7),
        );
        let table = orch.page_info(&docs, &ScanToken::detached()).unwrap();
        assert_eq!(table[&docs[1].path].page_count, 7);

        let token = ScanToken::detached();
        token.cancel();
        assert!(orch.page_info(&docs, &token).is_none());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let orch = BatchOrchestrator::new(Arc::new(ImageRasterizer::new())).with_concurrency(0);
        assert_eq!(orch.concurrency(), 1);
    }
}
