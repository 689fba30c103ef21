// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_has_no_exports_or_events() {
    let result = AtomResult::success();
    assert_eq!(result.status, AtomStatus::Success);
    assert!(result.exports.is_empty());
    assert!(result.events.is_empty());
}

#[test]
fn error_carries_message_as_event() {
    let result = AtomResult::error("boom");
    assert_eq!(result.status, AtomStatus::Error);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].kind, "error");
    assert_eq!(result.events[0].payload["message"], "boom");
}

#[test]
fn with_export_overwrites_existing_key() {
    let result = AtomResult::success()
        .with_export("count", serde_json::json!(1))
        .with_export("count", serde_json::json!(2));
    assert_eq!(result.exports["count"], serde_json::json!(2));
}

#[test]
fn with_event_appends_in_order() {
    let result = AtomResult::success()
        .with_event(AtomEvent::new("a", serde_json::json!(1)))
        .with_event(AtomEvent::new("b", serde_json::json!(2)));
    assert_eq!(result.events.len(), 2);
    assert_eq!(result.events[0].kind, "a");
    assert_eq!(result.events[1].kind, "b");
}

#[test]
fn waiting_and_failure_carry_the_expected_status() {
    assert_eq!(AtomResult::waiting().status, AtomStatus::Waiting);
    assert_eq!(AtomResult::failure().status, AtomStatus::Failure);
}
