use docsift::orchestrator::{BatchOrchestrator, ScanController};
use docsift::output::{JsonOutput, ScanSummary};
use docsift::raster::{DocumentRasterizer, Rasterizer, SUPPORTED_EXTENSIONS};
use docsift::scanner::list_documents;
use docsift::similarity::SortedScan;
use image::{Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn int(n: i64) -> Object {
    Object::Integer(n)
}

/// A US Letter PDF whose pages carry a heading bar and a few text-like lines.
fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut operations = vec![
        Operation::new("rg", vec![int(0), int(0), int(0)]),
        Operation::new("re", vec![int(72), int(680), int(300), int(40)]),
    ];
    for line in 0..12 {
        let width = 200 + (line * 37) % 240;
        operations.push(Operation::new(
            "re",
            vec![int(72), int(620 - line * 40), int(width), int(12)],
        ));
    }
    operations.push(Operation::new("f", vec![]));
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![int(0), int(0), int(612), int(792)],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => int(pages as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn test_pdfs_are_listed_fingerprinted_and_measured() {
    let dir = tempdir().unwrap();
    write_pdf(&dir.path().join("invoice.pdf"), 2);
    write_pdf(&dir.path().join("invoice_copy.pdf"), 2);
    RgbImage::from_fn(60, 60, |x, y| {
        let v = if (x / 10 + y / 10) % 2 == 0 { 20 } else { 230 };
        Rgb([v, v, v])
    })
    .save(dir.path().join("checker.png"))
    .unwrap();

    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    assert_eq!(docs.len(), 3);

    let orchestrator = BatchOrchestrator::new(Arc::new(DocumentRasterizer::new()));
    let controller = ScanController::new();
    let token = controller.begin();
    let hashed = orchestrator.hash_and_sort(&docs, &token);
    assert_eq!(hashed.unavailable, 0);

    let pdfs: Vec<_> = hashed
        .entries
        .iter()
        .filter(|e| e.path.extension().is_some_and(|ext| ext == "pdf"))
        .collect();
    assert_eq!(pdfs.len(), 2);
    assert_eq!(pdfs[0].fingerprint, pdfs[1].fingerprint);

    let pages = orchestrator.page_info(&docs, &token).unwrap();
    let invoice = pages[&dir.path().join("invoice.pdf")];
    assert_eq!(invoice.page_count, 2);
    assert!((invoice.height_over_width - 792.0 / 612.0).abs() < 1e-9);
    assert_eq!(pages[&dir.path().join("checker.png")].page_count, 1);

    let scan = SortedScan::new(hashed.entries, 8);
    let json = JsonOutput::new(&scan, &ScanSummary::default(), Some(&pages))
        .only_clusters(true)
        .to_json()
        .unwrap();
    assert!(json.contains("invoice_copy.pdf"));
    assert!(json.contains(r#""page_count":2"#));
}

#[test]
fn test_unknown_extension_degrades_to_fallbacks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.docx");
    std::fs::write(&path, b"PK\x03\x04").unwrap();

    let rasterizer = DocumentRasterizer::new();
    assert!(rasterizer.render(&path, 64, 64).is_none());
    assert_eq!(rasterizer.page_count(&path), 1);
    assert_eq!(rasterizer.height_over_width(&path), std::f64::consts::SQRT_2);
}
