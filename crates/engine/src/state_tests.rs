// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let persister = StatePersister::new(dir.path());
    let mut state = WorkflowState::new("t1");
    state.current_step_index = 2;
    state.context_cache.insert("count".to_string(), serde_json::json!(3));

    persister.save(&state, None).unwrap();
    let loaded = persister.load("t1", None).unwrap();

    assert_eq!(loaded.current_step_index, 2);
    assert_eq!(loaded.context_cache["count"], serde_json::json!(3));
}

#[test]
fn nested_sub_flow_state_is_keyed_by_hash_suffix() {
    let dir = tempdir().unwrap();
    let persister = StatePersister::new(dir.path());
    let state = WorkflowState::new("t1");

    persister.save(&state, Some("sub1")).unwrap();

    assert!(dir.path().join("t1#sub1.json").exists());
    assert!(persister.load("t1", Some("sub1")).is_some());
}

#[test]
fn corrupt_state_file_is_treated_as_absent() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("t1.json"), b"{not valid json").unwrap();
    let persister = StatePersister::new(dir.path());

    assert!(persister.load("t1", None).is_none());
}

#[test]
fn missing_state_file_is_absent() {
    let dir = tempdir().unwrap();
    let persister = StatePersister::new(dir.path());

    assert!(persister.load("nope", None).is_none());
    assert!(!persister.exists("nope", None));
}

#[test]
fn save_never_leaves_a_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let persister = StatePersister::new(dir.path());
    persister.save(&WorkflowState::new("t1"), None).unwrap();

    assert!(!dir.path().join("t1.tmp").exists());
    assert!(dir.path().join("t1.json").exists());
}

#[test]
fn exists_checks_presence_without_parsing() {
    let dir = tempdir().unwrap();
    let persister = StatePersister::new(dir.path());
    assert!(!persister.exists("t1", None));
    persister.save(&WorkflowState::new("t1"), None).unwrap();
    assert!(persister.exists("t1", None));
}
