// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::result::AtomStatus;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::tempdir;

fn write_script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn ctx<'a>(context: &'a serde_json::Map<String, serde_json::Value>) -> AtomContext<'a> {
    AtomContext { task_id: "t1", step_id: "s1", context }
}

#[test]
fn successful_script_reports_success_with_captured_stdout() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "echo hello; exit 0");
    let atom = ShellAtom::new("check", script);
    let context = serde_json::Map::new();

    let result = atom.call(&ctx(&context));

    assert_eq!(result.status, AtomStatus::Success);
    assert_eq!(result.exports["exit_code"], serde_json::json!(0));
    let stdout_event = result.events.iter().find(|e| e.kind == "stdout").expect("stdout event");
    assert_eq!(stdout_event.payload, serde_json::json!({ "text": "hello\n" }));
}

#[test]
fn nonzero_exit_reports_failure() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "fail.sh", "exit 7");
    let atom = ShellAtom::new("check", script);
    let context = serde_json::Map::new();

    let result = atom.call(&ctx(&context));

    assert_eq!(result.status, AtomStatus::Failure);
    assert_eq!(result.exports["exit_code"], serde_json::json!(7));
}

#[test]
fn missing_script_reports_error() {
    let atom = ShellAtom::new("check", "/no/such/script.sh");
    let context = serde_json::Map::new();

    let result = atom.call(&ctx(&context));

    assert_eq!(result.status, AtomStatus::Error);
}

#[test]
fn exceeding_timeout_reports_error_and_kills_child() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "slow.sh", "sleep 5; exit 0");
    let atom = ShellAtom::new("check", script).with_timeout(Duration::from_millis(50));
    let context = serde_json::Map::new();

    let result = atom.call(&ctx(&context));

    assert_eq!(result.status, AtomStatus::Error);
}
