// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = IntegrityStore::new(dir.path().join("status.md"));
    store.save(b"- [ ] a\n").unwrap();
    assert_eq!(store.load().unwrap(), b"- [ ] a\n");
}

#[test]
fn load_without_sidecar_is_not_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    fs::write(&path, b"- [ ] a\n").unwrap();
    let store = IntegrityStore::new(path);
    assert_eq!(store.load().unwrap(), b"- [ ] a\n");
}

#[test]
fn load_detects_tampered_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    let store = IntegrityStore::new(path.clone());
    store.save(b"- [ ] a\n").unwrap();

    fs::write(&path, b"- [ ] a (tampered)\n").unwrap();

    let err = store.load().unwrap_err();
    assert!(matches!(err, StatusError::Integrity { .. }));
}

#[test]
fn accept_updates_hash_without_touching_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    let store = IntegrityStore::new(path.clone());
    store.save(b"- [ ] a\n").unwrap();

    fs::write(&path, b"- [ ] a (edited)\n").unwrap();
    store.accept(b"- [ ] a (edited)\n").unwrap();

    assert_eq!(store.load().unwrap(), b"- [ ] a (edited)\n");
}

#[test]
fn decline_without_backup_errors() {
    let dir = tempdir().unwrap();
    let store = IntegrityStore::new(dir.path().join("status.md"));
    store.save(b"- [ ] a\n").unwrap();
    let err = store.decline().unwrap_err();
    assert!(matches!(err, StatusError::State(_)));
}

#[test]
fn decline_restores_prior_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    let store = IntegrityStore::new(path.clone());
    store.save(b"- [ ] v1\n").unwrap();
    store.save(b"- [ ] v2\n").unwrap();

    let restored = store.decline().unwrap();
    assert_eq!(restored, b"- [ ] v1\n");
    assert_eq!(store.load().unwrap(), b"- [ ] v1\n");
}

#[test]
fn backup_rotation_respects_keep_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    let store = IntegrityStore::new(path.clone()).with_keep(2);

    store.save(b"- [ ] v1\n").unwrap();
    store.save(b"- [ ] v2\n").unwrap();
    store.save(b"- [ ] v3\n").unwrap();
    store.save(b"- [ ] v4\n").unwrap();

    let backups_dir = dir.path().join("backups");
    let mut names: Vec<String> =
        fs::read_dir(&backups_dir).unwrap().map(|e| e.unwrap().file_name().to_str().unwrap().to_string()).collect();
    names.sort();
    assert_eq!(names.len(), 2, "expected exactly `keep` backups, found {names:?}");
    for name in &names {
        assert!(name.starts_with("status_") && name.ends_with(".md"));
    }

    // The two surviving backups are the two most recent rotations (v2 and
    // v3); the oldest (v1) was pruned. Contents, not names, are what the
    // rotation order guarantees.
    let contents: Vec<Vec<u8>> = names.iter().map(|n| fs::read(backups_dir.join(n)).unwrap()).collect();
    assert!(contents.contains(&b"- [ ] v2\n".to_vec()));
    assert!(contents.contains(&b"- [ ] v3\n".to_vec()));
    assert!(!contents.contains(&b"- [ ] v1\n".to_vec()));
}

#[test]
fn sidecar_records_the_latest_backup_pointer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.md");
    let store = IntegrityStore::new(path.clone());

    store.save(b"- [ ] v1\n").unwrap();
    store.save(b"- [ ] v2\n").unwrap();

    let meta_bytes = fs::read(dir.path().join("status.meta")).unwrap();
    let meta: serde_json::Value = serde_json::from_slice(&meta_bytes).unwrap();
    let backup_name = meta["backup"].as_str().unwrap();
    assert_eq!(fs::read(dir.path().join("backups").join(backup_name)).unwrap(), b"- [ ] v1\n");
}

#[test]
fn save_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("status.md");
    let store = IntegrityStore::new(path.clone());
    store.save(b"- [ ] a\n").unwrap();
    assert!(path.exists());
}
