use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docsift::cache::FingerprintCache;
use docsift::fingerprint::Method;
use docsift::orchestrator::{
    BatchOrchestrator, ScanController, THUMBNAIL_DATA_URL_PREFIX, THUMBNAIL_HEIGHT,
    THUMBNAIL_WIDTH,
};
use docsift::raster::{ImageRasterizer, SUPPORTED_EXTENSIONS};
use docsift::scanner::{list_documents, DocumentMeta};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// A page with a heading block and ragged lines of text, optionally inverted.
fn write_page(path: &Path, invert: bool) {
    let mut img = RgbImage::new(120, 170);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let heading = (8..40).contains(&x) && (6..18).contains(&y);
        let line = y > 30 && (y / 6) % 2 == 0 && x > 8 && x < 20 + (y * 7) % 90;
        let v: u8 = if heading || line { 25 } else { 235 };
        let v = if invert { 255 - v } else { v };
        *px = Rgb([v, v, v]);
    }
    img.save(path).unwrap();
}

fn folder() -> (TempDir, Vec<DocumentMeta>) {
    let dir = tempdir().unwrap();
    write_page(&dir.path().join("letter.png"), false);
    write_page(&dir.path().join("letter_copy.png"), false);
    write_page(&dir.path().join("negative.png"), true);
    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    (dir, docs)
}

fn orchestrator(cache: Option<Arc<FingerprintCache>>) -> BatchOrchestrator {
    let orchestrator = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
    match cache {
        Some(cache) => orchestrator.with_cache(cache),
        None => orchestrator,
    }
}

fn name_of(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_lookalike_pages_sort_together() {
    let (_dir, docs) = folder();
    let controller = ScanController::new();
    let outcome = orchestrator(None).hash_and_sort(&docs, &controller.begin());

    assert!(!outcome.cancelled);
    assert_eq!(outcome.entries.len(), 3);
    assert_eq!(outcome.computed, 3);
    assert_eq!(outcome.cached, 0);
    assert_eq!(outcome.unavailable, 0);
    assert!(outcome.entries.iter().all(|e| e.method == Method::Perceptual));

    let letter: Vec<_> = outcome
        .entries
        .iter()
        .filter(|e| name_of(&e.path).starts_with("letter"))
        .collect();
    assert_eq!(letter.len(), 2);
    assert_eq!(letter[0].fingerprint, letter[1].fingerprint);

    let negative = outcome
        .entries
        .iter()
        .find(|e| name_of(&e.path) == "negative.png")
        .unwrap();
    assert!(negative.fingerprint.distance(letter[0].fingerprint) > 8);

    // Identical fingerprints are adjacent in the sorted order.
    let positions: Vec<usize> = outcome
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| name_of(&e.path).starts_with("letter"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(positions[1] - positions[0], 1);
}

#[test]
fn test_second_scan_is_served_from_cache() {
    let (_dir, docs) = folder();
    let cache_dir = tempdir().unwrap();
    let cache = Arc::new(FingerprintCache::new(cache_dir.path()));
    let controller = ScanController::new();

    let first = orchestrator(Some(Arc::clone(&cache))).hash_and_sort(&docs, &controller.begin());
    assert_eq!(first.computed, 3);
    assert_eq!(cache.stats().records, 3);

    let second = orchestrator(Some(cache)).hash_and_sort(&docs, &controller.begin());
    assert_eq!(second.cached, 3);
    assert_eq!(second.computed, 0);
    assert_eq!(first.entries, second.entries);
}

#[test]
fn test_unreadable_document_sorts_first_as_unavailable() {
    let (dir, _) = folder();
    fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    let controller = ScanController::new();

    let outcome = orchestrator(None).hash_and_sort(&docs, &controller.begin());
    assert_eq!(outcome.entries.len(), 4);
    assert_eq!(outcome.unavailable, 1);

    let first = &outcome.entries[0];
    assert_eq!(name_of(&first.path), "broken.png");
    assert_eq!(first.method, Method::Unavailable);
    assert!(first.fingerprint.is_zero());
    assert!(!first.is_valid());
}

#[test]
fn test_empty_folder_yields_empty_outcome() {
    let dir = tempdir().unwrap();
    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    let controller = ScanController::new();

    let outcome = orchestrator(None).hash_and_sort(&docs, &controller.begin());
    assert!(outcome.entries.is_empty());
    assert!(!outcome.cancelled);
}

#[test]
fn test_thumbnails_are_png_data_urls_within_box() {
    let (_dir, docs) = folder();
    let controller = ScanController::new();
    let outcome = orchestrator(None)
        .with_concurrency(3)
        .render_thumbnails(&docs, &controller.begin());

    assert!(!outcome.cancelled);
    assert_eq!(outcome.rendered, 3);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.thumbnails.len(), docs.len());

    for (thumb, meta) in outcome.thumbnails.iter().zip(&docs) {
        assert_eq!(thumb.path, meta.path);
        assert_eq!(thumb.page_count, 1);
        let url = thumb.data_url.as_deref().unwrap();
        let payload = url.strip_prefix(THUMBNAIL_DATA_URL_PREFIX).unwrap();
        let png = STANDARD.decode(payload).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert!(img.width() <= THUMBNAIL_WIDTH);
        assert!(img.height() <= THUMBNAIL_HEIGHT);
    }
}

#[test]
fn test_thumbnails_merge_into_fingerprint_records() {
    let (_dir, docs) = folder();
    let cache_dir = tempdir().unwrap();
    let cache = Arc::new(FingerprintCache::new(cache_dir.path()));
    let controller = ScanController::new();
    let orchestrator = orchestrator(Some(Arc::clone(&cache)));

    let hashed = orchestrator.hash_and_sort(&docs, &controller.begin());
    let first = orchestrator.render_thumbnails(&docs, &controller.begin());
    assert_eq!(first.rendered, 3);
    assert_eq!(cache.stats().records, 3);

    let second = orchestrator.render_thumbnails(&docs, &controller.begin());
    assert_eq!(second.cached, 3);
    assert!(second.thumbnails.iter().all(|t| t.from_cache));

    let again = orchestrator.hash_and_sort(&docs, &controller.begin());
    assert_eq!(again.cached, 3);
    assert_eq!(again.entries, hashed.entries);
}

#[test]
fn test_failed_thumbnail_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.png"), b"garbage").unwrap();
    write_page(&dir.path().join("ok.png"), false);
    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    let controller = ScanController::new();

    let outcome = orchestrator(None).render_thumbnails(&docs, &controller.begin());
    assert_eq!(outcome.rendered, 1);
    assert_eq!(outcome.failed, 1);
    let broken = &outcome.thumbnails[0];
    assert_eq!(name_of(&broken.path), "broken.png");
    assert!(broken.data_url.is_none());
    assert_eq!(broken.page_count, 1);
}
