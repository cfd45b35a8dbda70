use docsift::config::Preferences;
use docsift::similarity::DEFAULT_THRESHOLD;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_preferences_use_defaults() {
    let dir = tempdir().unwrap();
    let prefs = Preferences::load(Some(&dir.path().join("preferences.toml")));
    assert_eq!(prefs.threshold, DEFAULT_THRESHOLD);
}

#[test]
fn test_threshold_persists_between_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("preferences.toml");

    let saved = Preferences { threshold: 14 }.save(Some(&path)).unwrap();
    assert_eq!(saved, path);
    assert!(path.exists());

    let loaded = Preferences::load_from(&path).unwrap();
    assert_eq!(loaded.threshold, 14);
}

#[test]
fn test_hand_written_preferences_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preferences.toml");
    fs::write(&path, "threshold = 3\n").unwrap();
    assert_eq!(Preferences::load(Some(&path)).threshold, 3);

    fs::write(&path, "# nothing set\n").unwrap();
    assert_eq!(Preferences::load(Some(&path)).threshold, DEFAULT_THRESHOLD);
}

#[test]
fn test_malformed_preferences_fall_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preferences.toml");
    fs::write(&path, "threshold = \"lots\"\n").unwrap();

    assert!(Preferences::load_from(&path).is_err());
    assert_eq!(Preferences::load(Some(&path)).threshold, DEFAULT_THRESHOLD);
}
