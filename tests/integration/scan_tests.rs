use docsift::raster::SUPPORTED_EXTENSIONS;
use docsift::scanner::{list_documents, ScanError};
use filetime::FileTime;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_lists_only_matching_files_in_folder() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.PNG"), b"x").unwrap();
    fs::write(dir.path().join("a.tiff"), b"xy").unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    fs::write(dir.path().join("no_extension"), b"ignored").unwrap();
    fs::create_dir(dir.path().join("nested.png")).unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("deep.png"), b"ignored").unwrap();

    let docs = list_documents(dir.path(), SUPPORTED_EXTENSIONS).unwrap();
    let names: Vec<_> = docs
        .iter()
        .map(|d| d.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.tiff", "b.PNG"]);
    assert_eq!(docs[0].size, 2);
}

#[test]
fn test_metadata_reflects_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.png");
    fs::write(&path, vec![0u8; 1234]).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 500)).unwrap();

    let docs = list_documents(dir.path(), &["png"]).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].size, 1234);
    assert_eq!(docs[0].modified_nanos(), 1_600_000_000_000_000_500);
}

#[test]
fn test_custom_extension_list() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
    fs::write(dir.path().join("b.png"), b"png").unwrap();

    let docs = list_documents(dir.path(), &["pdf"]).unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs[0].path.ends_with("a.pdf"));
}

#[test]
fn test_missing_folder_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");
    assert!(matches!(
        list_documents(&missing, SUPPORTED_EXTENSIONS),
        Err(ScanError::NotFound(_))
    ));
}

#[test]
fn test_file_instead_of_folder_is_an_error() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.png");
    fs::write(&file, b"x").unwrap();
    assert!(matches!(
        list_documents(&file, SUPPORTED_EXTENSIONS),
        Err(ScanError::NotADirectory(_))
    ));
}
