use docsift::catalog::{Catalog, PublishOutcome};
use docsift::fingerprint::{Fingerprint, Method};
use docsift::orchestrator::ScanController;
use docsift::similarity::HashEntry;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn entry(name: &str, fp: u64) -> HashEntry {
    HashEntry {
        path: PathBuf::from(name),
        fingerprint: Fingerprint::new(fp),
        method: Method::Perceptual,
        size: 100,
        modified: SystemTime::UNIX_EPOCH,
    }
}

fn group_sizes(catalog: &Catalog) -> Vec<usize> {
    catalog.scan().groups().map(<[HashEntry]>::len).collect()
}

#[test]
fn test_threshold_change_regroups_without_reordering() {
    let controller = ScanController::new();
    let mut catalog = Catalog::new(0);
    let token = controller.begin();
    let published = catalog.publish(
        &token,
        vec![
            entry("/c.png", 0b1111),
            entry("/a.png", 0b0001),
            entry("/b.png", 0b0011),
            entry("/z.png", u64::MAX),
        ],
    );
    assert_eq!(published, PublishOutcome::Accepted);
    let order: Vec<PathBuf> = catalog.entries().iter().map(|e| e.path.clone()).collect();
    assert_eq!(group_sizes(&catalog), vec![1, 1, 1, 1]);

    catalog.set_threshold(1);
    assert_eq!(group_sizes(&catalog), vec![2, 1, 1]);

    catalog.set_threshold(2);
    assert_eq!(group_sizes(&catalog), vec![3, 1]);

    catalog.set_threshold(64);
    assert_eq!(group_sizes(&catalog), vec![4]);

    let after: Vec<PathBuf> = catalog.entries().iter().map(|e| e.path.clone()).collect();
    assert_eq!(order, after);
}

#[test]
fn test_trashed_documents_leave_the_catalog() {
    let controller = ScanController::new();
    let mut catalog = Catalog::default();
    catalog.publish(
        &controller.begin(),
        vec![entry("/a.png", 1), entry("/b.png", 1), entry("/c.png", u64::MAX)],
    );

    let removed = catalog.remove_paths(&[Path::new("/b.png"), Path::new("/missing.png")]);
    assert_eq!(removed, 1);
    assert_eq!(catalog.entries().len(), 2);
    assert_eq!(group_sizes(&catalog), vec![1, 1]);
}

#[test]
fn test_clear_then_rescan() {
    let controller = ScanController::new();
    let mut catalog = Catalog::default();
    catalog.publish(&controller.begin(), vec![entry("/a.png", 1)]);
    catalog.clear();
    assert!(catalog.entries().is_empty());

    let rescan = controller.begin();
    assert_eq!(
        catalog.publish(&rescan, vec![entry("/a.png", 1), entry("/b.png", 2)]),
        PublishOutcome::Accepted
    );
    assert_eq!(catalog.published_id(), rescan.id());
    assert_eq!(catalog.entries().len(), 2);
}
