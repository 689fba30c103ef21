// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::document::{Status, StatusDocument};
use tempfile::tempdir;

fn load(bytes: &[u8]) -> StatusResult<(StatusTree, tempfile::TempDir)> {
    let dir = tempdir().unwrap();
    let tree = StatusTree::load(bytes, dir.path())?;
    Ok((tree, dir))
}

#[test]
fn assigns_dotted_virtual_ids() {
    let bytes = b"- [ ] a\n    - [ ] a1\n    - [ ] a2\n- [ ] b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    assert_eq!(tree.find("1").unwrap().name, "a");
    assert_eq!(tree.find("1.1").unwrap().name, "a1");
    assert_eq!(tree.find("1.2").unwrap().name, "a2");
    assert_eq!(tree.find("2").unwrap().name, "b");
}

#[test]
fn find_unknown_id_is_id_error() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    let err = tree.find("9.9").unwrap_err();
    assert!(matches!(err, StatusError::Id(_)));
}

#[test]
fn find_stale_id_after_removal() {
    let bytes = b"- [ ] a\n- [ ] b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    // Touch "2" so it's recorded as having been valid.
    tree.find("2").unwrap();
    tree.remove_task("1").unwrap();
    let err = tree.find("2").unwrap_err();
    assert!(matches!(err, StatusError::StaleId(_)));
}

#[test]
fn rejects_two_active_siblings_ambiguous_focus() {
    let bytes = b"- [/] a\n- [/] b\n";
    let err = load(bytes).unwrap_err();
    match err {
        StatusError::Validation(msg) => assert!(msg.contains("Ambiguous Focus")),
        other => panic!("expected Validation(Ambiguous Focus), got {other:?}"),
    }
}

#[test]
fn rejects_active_child_under_pending_parent() {
    let bytes = b"- [ ] parent\n    - [/] child\n";
    let err = load(bytes).unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn allows_active_child_under_active_parent() {
    let bytes = b"- [/] parent\n    - [/] child\n";
    let (tree, _dir) = load(bytes).unwrap();
    let (id, task) = tree.get_active_task().unwrap();
    assert_eq!(id, "1.1");
    assert_eq!(task.name, "child");
}

#[test]
fn rejects_done_parent_with_pending_descendant() {
    let bytes = b"- [x] parent\n    - [ ] child\n";
    let err = load(bytes).unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn allows_done_parent_with_done_and_skipped_descendants() {
    let bytes = b"- [x] parent\n    - [x] child-a\n    - [-] child-b\n";
    let (tree, _dir) = load(bytes).unwrap();
    assert_eq!(tree.roots().len(), 1);
}

#[test]
fn rejects_duplicate_sibling_names() {
    let bytes = b"- [ ] dup\n- [ ] dup\n";
    let err = load(bytes).unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn get_active_task_falls_back_to_smart_resume() {
    let bytes = b"- [x] done-task\n- [ ] pending-leaf\n- [ ] another-pending\n";
    let (tree, _dir) = load(bytes).unwrap();
    let (id, task) = tree.get_active_task().unwrap();
    assert_eq!(id, "2");
    assert_eq!(task.name, "pending-leaf");
}

#[test]
fn get_active_task_smart_resume_skips_into_children() {
    let bytes = b"- [x] done\n    - [x] done-child\n- [ ] parent\n    - [ ] leaf\n";
    let (tree, _dir) = load(bytes).unwrap();
    let (id, task) = tree.get_active_task().unwrap();
    assert_eq!(id, "2.1");
    assert_eq!(task.name, "leaf");
}

#[test]
fn path_traversal_ref_is_rejected_as_jailbreak() {
    let bytes = b"- [ ] task @ ../../etc/passwd\n";
    let err = load(bytes).unwrap_err();
    match err {
        StatusError::Validation(msg) => assert!(msg.contains("Jailbreak attempt")),
        other => panic!("expected Validation(Jailbreak attempt), got {other:?}"),
    }
}

#[test]
fn add_task_appends_and_returns_new_virtual_id() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    let id = tree.add_task(None, "b", Status::Pending, None).unwrap();
    assert_eq!(id, "2");
    assert_eq!(tree.find("2").unwrap().name, "b");
}

#[test]
fn add_task_rejects_duplicate_sibling_name() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    let err = tree.add_task(None, "a", Status::Pending, None).unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn add_task_under_parent_at_explicit_index() {
    let bytes = b"- [ ] parent\n    - [ ] existing\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    let id = tree.add_task(Some("1"), "new-first", Status::Pending, Some(0)).unwrap();
    assert_eq!(id, "1.1");
    assert_eq!(tree.find("1.1").unwrap().name, "new-first");
    assert_eq!(tree.find("1.2").unwrap().name, "existing");
}

#[test]
fn update_task_with_wrong_anchor_is_rejected() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    let err = tree.update_task("1", None, Some(Status::Active), Some("not-a")).unwrap_err();
    assert!(matches!(err, StatusError::Anchor { .. }));
}

#[test]
fn update_task_activates_with_matching_anchor() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    tree.update_task("1", None, Some(Status::Active), Some("a")).unwrap();
    assert_eq!(tree.find("1").unwrap().status, Status::Active);
}

#[test]
fn update_task_rejects_activating_with_active_sibling() {
    let bytes = b"- [/] a\n- [ ] b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    let err = tree.update_task("2", None, Some(Status::Active), None).unwrap_err();
    assert!(matches!(err, StatusError::State(_)));
}

#[test]
fn update_task_rejects_activating_under_non_active_parent() {
    let bytes = b"- [ ] parent\n    - [ ] child\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    let err = tree.update_task("1.1", None, Some(Status::Active), None).unwrap_err();
    assert!(matches!(err, StatusError::State(_)));
}

#[test]
fn completion_bubble_promotes_parent_when_last_child_done() {
    let bytes = b"- [/] parent\n    - [x] child-a\n    - [/] child-b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    tree.update_task("1.2", None, Some(Status::Done), None).unwrap();
    assert_eq!(tree.find("1").unwrap().status, Status::Done);
}

#[test]
fn activation_bubble_promotes_pending_parent_when_sibling_remains() {
    let bytes = b"- [ ] parent\n    - [/] child-a\n    - [ ] child-b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    tree.update_task("1.1", None, Some(Status::Done), None).unwrap();
    assert_eq!(tree.find("1").unwrap().status, Status::Active);
    assert_eq!(tree.find("1.2").unwrap().status, Status::Pending);
}

#[test]
fn remove_task_then_reconciles_remaining_siblings() {
    let bytes = b"- [/] parent\n    - [/] child-a\n    - [x] child-b\n";
    let (mut tree, _dir) = load(bytes).unwrap();
    tree.remove_task("1.1").unwrap();
    assert_eq!(tree.find("1").unwrap().status, Status::Done);
}

#[test]
fn serialize_round_trips_after_mutation() {
    let (mut tree, _dir) = load(b"- [ ] a\n").unwrap();
    tree.update_task("1", None, Some(Status::Active), Some("a")).unwrap();
    let bytes = tree.serialize().unwrap();
    let reparsed = StatusDocument::parse(&bytes).unwrap();
    assert_eq!(reparsed.roots[0].status, Status::Active);
}
