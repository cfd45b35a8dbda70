use docsift::catalog::{Catalog, PublishOutcome};
use docsift::orchestrator::{BatchOrchestrator, ScanController, ScanToken};
use docsift::progress::ProgressCallback;
use docsift::raster::{ImageRasterizer, SUPPORTED_EXTENSIONS};
use docsift::scanner::{list_documents, DocumentMeta};
use image::{Rgb, RgbImage};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

fn folder(count: u32) -> (TempDir, Vec<DocumentMeta>) {
    let dir = tempdir().unwrap();
    for i in 0..count {
        let mut img = RgbImage::new(40, 56);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = if (x + y * (i + 1)) % 7 < 3 { 20 } else { 230 };
            *px = Rgb([v, v, v]);
        }
        img.save(dir.path().join(format!("page{i:02}.png"))).unwrap();
    }
    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    (dir, docs)
}

/// Starts a new scan as soon as the first document of the running scan completes.
struct Supersede {
    controller: ScanController,
    next: Mutex<Option<ScanToken>>,
}

impl ProgressCallback for Supersede {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        let mut next = self.next.lock().unwrap();
        if next.is_none() {
            *next = Some(self.controller.begin());
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_superseded_scan_is_never_published() {
    let (_dir, docs) = folder(20);
    let controller = ScanController::new();
    let callback = Arc::new(Supersede {
        controller: controller.clone(),
        next: Mutex::new(None),
    });
    let orchestrator = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()))
        .with_progress_callback(callback.clone());

    let first = controller.begin();
    let outcome = orchestrator.hash_and_sort(&docs, &first);
    assert!(outcome.cancelled);
    assert!(outcome.entries.is_empty());
    assert!(!first.is_live());

    let second = callback.next.lock().unwrap().clone().unwrap();
    assert_eq!(second.id(), first.id() + 1);
    let plain = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
    let outcome2 = plain.hash_and_sort(&docs, &second);
    assert!(!outcome2.cancelled);
    assert_eq!(outcome2.entries.len(), 20);

    let mut catalog = Catalog::default();
    assert_eq!(catalog.publish(&first, Vec::new()), PublishOutcome::Stale);
    assert_eq!(catalog.publish(&second, outcome2.entries), PublishOutcome::Accepted);
    assert_eq!(catalog.published_id(), second.id());
    assert_eq!(catalog.entries().len(), 20);
}

#[test]
fn test_results_of_older_scan_arriving_late_are_dropped() {
    let (_dir, docs) = folder(3);
    let controller = ScanController::new();
    let orchestrator = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));

    let first = controller.begin();
    let first_outcome = orchestrator.hash_and_sort(&docs, &first);
    assert!(!first_outcome.cancelled);

    let second = controller.begin();
    let second_outcome = orchestrator.hash_and_sort(&docs[..1], &second);

    let mut catalog = Catalog::default();
    assert_eq!(catalog.publish(&second, second_outcome.entries), PublishOutcome::Accepted);
    assert_eq!(catalog.publish(&first, first_outcome.entries), PublishOutcome::Stale);
    assert_eq!(catalog.entries().len(), 1);
}

#[test]
fn test_cancelled_scan_does_no_work() {
    let (_dir, docs) = folder(2);
    let controller = ScanController::new();
    let token = controller.begin();
    controller.cancel_current();

    let orchestrator = BatchOrchestrator::new(Arc::new(ImageRasterizer::new()));
    assert!(orchestrator.hash_and_sort(&docs, &token).cancelled);
    let thumbs = orchestrator.render_thumbnails(&docs, &token);
    assert!(thumbs.cancelled);
    assert!(thumbs.thumbnails.is_empty());

    let mut catalog = Catalog::default();
    assert_eq!(catalog.publish(&token, Vec::new()), PublishOutcome::Stale);
    assert_eq!(catalog.published_id(), 0);
}

#[test]
fn test_shutdown_request_cancels_running_scan() {
    let controller = ScanController::new();
    let handler = docsift::signal::ShutdownHandler::new();
    handler.attach(&controller);

    let token = controller.begin();
    assert!(token.is_live());
    handler.request_shutdown();
    assert!(handler.is_shutdown_requested());
    assert!(!token.is_live());
}
