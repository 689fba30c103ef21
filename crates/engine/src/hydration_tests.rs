// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn finds_marker_in_the_starting_directory() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".flow")).unwrap();

    let (root, data_dir) = discover_root(dir.path(), &[".flow".to_string()]).unwrap();

    assert_eq!(root, dunce::canonicalize(dir.path()).unwrap());
    assert_eq!(data_dir, root.join(".flow"));
}

#[test]
fn finds_marker_in_an_ancestor() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".flow")).unwrap();
    let nested = dir.path().join("sub").join("deeper");
    std::fs::create_dir_all(&nested).unwrap();

    let (root, _data_dir) = discover_root(&nested, &[".flow".to_string()]).unwrap();

    assert_eq!(root, dunce::canonicalize(dir.path()).unwrap());
}

#[test]
fn nested_roots_bind_to_the_nearest_one() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".flow")).unwrap();
    let nested_root = dir.path().join("nested");
    std::fs::create_dir_all(nested_root.join(".flow")).unwrap();

    let (root, _data_dir) = discover_root(&nested_root, &[".flow".to_string()]).unwrap();

    assert_eq!(root, dunce::canonicalize(&nested_root).unwrap());
}

#[test]
fn no_marker_anywhere_is_root_not_found() {
    let dir = tempdir().unwrap();
    let err = discover_root(dir.path(), &[".flow".to_string()]).unwrap_err();
    assert!(matches!(err, EngineError::RootNotFound(_)));
}

#[test]
fn custom_marker_names_are_honored() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".myflow")).unwrap();

    let (root, data_dir) = discover_root(dir.path(), &[".myflow".to_string()]).unwrap();

    assert_eq!(root, dunce::canonicalize(dir.path()).unwrap());
    assert_eq!(data_dir, root.join(".myflow"));
}
