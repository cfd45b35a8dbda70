use docsift::cache::{CacheKey, CacheRecord, FingerprintCache};
use docsift::fingerprint::{Fingerprint, FingerprintResult, Method};
use filetime::FileTime;
use std::fs;
use tempfile::tempdir;

fn perceptual(value: u64) -> FingerprintResult {
    FingerprintResult {
        value: Fingerprint::new(value),
        method: Method::Perceptual,
    }
}

fn key(name: &str) -> CacheKey {
    CacheKey::new(std::path::Path::new(name), 1_700_000_000_000_000_000, 4096)
}

fn age(cache: &FingerprintCache, key: &CacheKey, unix_secs: i64) {
    filetime::set_file_mtime(cache.record_path(key), FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

#[test]
fn test_fingerprint_and_thumbnail_share_a_record() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let k = key("/docs/invoice.png");

    cache.store_fingerprint(&k, perceptual(0xdead_beef));
    cache.set_merged(
        &k,
        CacheRecord::new()
            .with_thumbnail("data:image/png;base64,AAAA")
            .with_page_count(3),
    );

    let record = cache.get(&k).unwrap();
    assert_eq!(record.fingerprint(), Some(perceptual(0xdead_beef)));
    assert_eq!(record.thumbnail(), Some("data:image/png;base64,AAAA"));
    assert_eq!(record.page_count(), Some(3));
    assert_eq!(cache.list_records().len(), 1);
}

#[test]
fn test_unavailable_fingerprint_is_cached() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let k = key("/docs/broken.png");

    cache.store_fingerprint(&k, FingerprintResult::unavailable());
    let hit = cache.lookup_fingerprint(&k).unwrap();
    assert!(!hit.is_valid());
    assert!(hit.value.is_zero());
}

#[test]
fn test_changed_document_misses() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let path = std::path::Path::new("/docs/report.png");

    cache.store_fingerprint(&CacheKey::new(path, 100, 10), perceptual(1));
    assert!(cache.lookup_fingerprint(&CacheKey::new(path, 200, 10)).is_none());
    assert!(cache.lookup_fingerprint(&CacheKey::new(path, 100, 11)).is_none());
    assert_eq!(cache.lookup_fingerprint(&CacheKey::new(path, 100, 10)), Some(perceptual(1)));
}

#[test]
fn test_eviction_removes_least_recently_touched() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let (a, b, c) = (key("/a.png"), key("/b.png"), key("/c.png"));
    for k in [&a, &b, &c] {
        cache.store_fingerprint(k, perceptual(42));
    }
    age(&cache, &a, 1_000_000);
    age(&cache, &b, 2_000_000);
    age(&cache, &c, 3_000_000);

    let oldest = fs::metadata(cache.record_path(&a)).unwrap().len();
    let budget = cache.total_size() - oldest;
    let report = FingerprintCache::new(dir.path())
        .with_budget(budget)
        .enforce_limit();

    assert_eq!(report.evicted, 1);
    assert_eq!(report.freed_bytes, oldest);
    assert!(report.total_after <= budget);
    assert!(!cache.record_path(&a).exists());
    assert!(cache.record_path(&b).exists());
    assert!(cache.record_path(&c).exists());
}

#[test]
fn test_reading_a_record_protects_it_from_eviction() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let (a, b, c) = (key("/a.png"), key("/b.png"), key("/c.png"));
    for k in [&a, &b, &c] {
        cache.store_fingerprint(k, perceptual(7));
    }
    age(&cache, &a, 1_000_000);
    age(&cache, &b, 2_000_000);
    age(&cache, &c, 3_000_000);

    // Reading the oldest record makes it the most recent one.
    assert!(cache.get(&a).is_some());

    let second = fs::metadata(cache.record_path(&b)).unwrap().len();
    let budget = cache.total_size() - second;
    let report = FingerprintCache::new(dir.path())
        .with_budget(budget)
        .enforce_limit();

    assert_eq!(report.evicted, 1);
    assert!(cache.record_path(&a).exists());
    assert!(!cache.record_path(&b).exists());
    assert!(cache.record_path(&c).exists());
}

#[test]
fn test_eviction_keeps_last_record_over_budget() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path()).with_budget(1);
    let (a, b) = (key("/a.png"), key("/b.png"));

    cache.store_fingerprint(&a, perceptual(1));
    age(&cache, &a, 1_000_000);
    cache.store_fingerprint(&b, perceptual(2));

    let records = cache.list_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, cache.record_path(&b));
    assert_eq!(cache.enforce_limit().evicted, 0);
}

#[test]
fn test_writes_stay_within_budget() {
    let dir = tempdir().unwrap();
    let sizing = FingerprintCache::new(dir.path());
    sizing.store_fingerprint(&key("/sizing.png"), perceptual(u64::MAX));
    let one = sizing.total_size();
    assert!(sizing.clear());

    let cache = FingerprintCache::new(dir.path()).with_budget(one * 3);
    for i in 0..10 {
        cache.store_fingerprint(&key(&format!("/doc{i}.png")), perceptual(u64::MAX - i));
    }
    assert!(cache.total_size() <= one * 3);
    assert!(!cache.list_records().is_empty());
}

#[test]
fn test_clear_leaves_empty_directory() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path().join("cache"));
    cache.store_fingerprint(&key("/a.png"), perceptual(1));
    cache.store_fingerprint(&key("/b.png"), perceptual(2));

    assert!(cache.clear());
    assert!(cache.dir().is_dir());
    assert!(cache.list_records().is_empty());
    assert_eq!(cache.stats().total_bytes, 0);
    assert!(cache.lookup_fingerprint(&key("/a.png")).is_none());
}

#[test]
fn test_corrupt_record_reads_as_miss_and_is_rewritten() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(dir.path());
    let k = key("/a.png");
    fs::write(cache.record_path(&k), b"{ not json").unwrap();

    assert!(cache.get(&k).is_none());
    cache.store_fingerprint(&k, perceptual(9));
    assert_eq!(cache.lookup_fingerprint(&k), Some(perceptual(9)));
}

#[test]
fn test_foreign_files_are_ignored() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"not a record").unwrap();
    let cache = FingerprintCache::new(dir.path());
    cache.store_fingerprint(&key("/a.png"), perceptual(1));

    assert_eq!(cache.stats().records, 1);
    assert!(dir.path().join("notes.txt").exists());
}
