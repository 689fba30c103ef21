// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_flat_task_list() {
    let doc = StatusDocument::parse(b"- [ ] one\n- [x] two\n- [/] three\n").unwrap();
    assert_eq!(doc.roots.len(), 3);
    assert_eq!(doc.roots[0].name, "one");
    assert_eq!(doc.roots[0].status, Status::Pending);
    assert_eq!(doc.roots[1].status, Status::Done);
    assert_eq!(doc.roots[2].status, Status::Active);
}

#[test]
fn parses_nested_tasks() {
    let bytes = b"- [/] parent\n    - [x] child-a\n    - [ ] child-b\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    assert_eq!(doc.roots.len(), 1);
    assert_eq!(doc.roots[0].children.len(), 2);
    assert_eq!(doc.roots[0].children[0].name, "child-a");
    assert_eq!(doc.roots[0].children[1].name, "child-b");
}

#[test]
fn parses_headers() {
    let bytes = b"Title: My Workflow\nOwner: alice\n\n- [ ] task\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    assert_eq!(doc.header("Title"), Some("My Workflow"));
    assert_eq!(doc.header("Owner"), Some("alice"));
    assert_eq!(doc.roots.len(), 1);
}

#[test]
fn duplicate_header_keys_last_write_wins() {
    let bytes = b"Key: first\nKey: second\n\n- [ ] task\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    assert_eq!(doc.header("Key"), Some("second"));
}

#[test]
fn normalizes_v_and_capital_x_to_done() {
    let doc = StatusDocument::parse(b"- [v] a\n- [X] b\n").unwrap();
    assert_eq!(doc.roots[0].status, Status::Done);
    assert_eq!(doc.roots[1].status, Status::Done);
}

#[test]
fn rejects_tab_indentation() {
    let err = StatusDocument::parse(b"\t- [ ] task\n").unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn rejects_non_multiple_of_four_indent() {
    let err = StatusDocument::parse(b"  - [ ] task\n").unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn rejects_malformed_marker() {
    let err = StatusDocument::parse(b"- [q] task\n").unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn rejects_skipped_indentation_level() {
    let bytes = b"- [ ] top\n        - [ ] grandchild-without-parent\n";
    let err = StatusDocument::parse(bytes).unwrap_err();
    assert!(matches!(err, StatusError::Validation(_)));
}

#[test]
fn discards_html_comments_on_read() {
    let bytes = b"<!-- a top comment -->\n- [ ] task\n    <!-- nested comment -->\n    - [ ] child\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    assert_eq!(doc.roots.len(), 1);
    assert_eq!(doc.roots[0].children.len(), 1);
}

#[test]
fn parses_bare_ref_path() {
    let doc = StatusDocument::parse(b"- [/] task @ sub.md\n").unwrap();
    assert_eq!(doc.roots[0].ref_path.as_deref(), Some("sub.md"));
    assert_eq!(doc.roots[0].name, "task");
}

#[test]
fn parses_quoted_ref_path_with_spaces() {
    let doc = StatusDocument::parse(b"- [/] task @ \"sub dir/status.md\"\n").unwrap();
    assert_eq!(doc.roots[0].ref_path.as_deref(), Some("sub dir/status.md"));
}

#[test]
fn preserves_bom_round_trip() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"- [ ] task\n");
    let doc = StatusDocument::parse(&bytes).unwrap();
    assert!(doc.had_bom);
    let out = doc.serialize().unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn unicode_name_round_trips_byte_for_byte() {
    let name = "Fix bug\u{2026} maybe? \u{1f40d} \u{fc}n\u{ef}c\u{f6}d\u{e9}";
    let bytes = format!("- [ ] {name}\n").into_bytes();
    let doc = StatusDocument::parse(&bytes).unwrap();
    assert_eq!(doc.roots[0].name, name);
    let out = doc.serialize().unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn serialize_writes_canonical_lowercase_x_marker() {
    let mut doc = StatusDocument::new();
    doc.roots.push(Task::new("done task", Status::Done));
    let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
    assert_eq!(out, "- [x] done task\n");
}

#[test]
fn serialize_headers_then_blank_line_then_body() {
    let mut doc = StatusDocument::new();
    doc.set_header("Title", "demo");
    doc.roots.push(Task::new("task", Status::Pending));
    let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
    assert_eq!(out, "Title: demo\n\n- [ ] task\n");
}

#[test]
fn round_trip_is_stable_for_canonical_input() {
    let bytes = b"Title: demo\n\n- [/] parent\n    - [x] child\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    let out = doc.serialize().unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn crlf_input_normalizes_to_lf_on_save() {
    let bytes = b"- [ ] task\r\n";
    let doc = StatusDocument::parse(bytes).unwrap();
    let out = doc.serialize().unwrap();
    assert_eq!(out, b"- [ ] task\n");
}
