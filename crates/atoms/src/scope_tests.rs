// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn resolve_path_accepts_paths_under_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), b"x").unwrap();
    let allowlist = vec![];
    let wrapper = ScopedToolWrapper::new("worker", dir.path(), &allowlist);

    let resolved = wrapper.resolve_path("f.txt").unwrap();

    assert_eq!(resolved, dir.path().join("f.txt"));
}

#[test]
fn resolve_path_rejects_escape_attempts() {
    let dir = tempdir().unwrap();
    let allowlist = vec![];
    let wrapper = ScopedToolWrapper::new("worker", dir.path(), &allowlist);

    let err = wrapper.resolve_path("../outside.txt").unwrap_err();

    assert!(matches!(err, ScopeError::Path(_)));
}

#[test]
fn check_tool_allows_listed_commands() {
    let dir = tempdir().unwrap();
    let allowlist = vec!["pytest".to_string(), "cargo".to_string()];
    let wrapper = ScopedToolWrapper::new("worker", dir.path(), &allowlist);

    assert!(wrapper.check_tool("pytest").is_ok());
}

#[test]
fn check_tool_rejects_unlisted_commands() {
    let dir = tempdir().unwrap();
    let allowlist = vec!["pytest".to_string()];
    let wrapper = ScopedToolWrapper::new("worker", dir.path(), &allowlist);

    let err = wrapper.check_tool("rm").unwrap_err();

    assert!(matches!(err, ScopeError::CommandNotAllowed(cmd, role) if cmd == "rm" && role == "worker"));
}
