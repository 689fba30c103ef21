// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn registry_with(entries: &str) -> Registry {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flow.registry.json");
    std::fs::write(&path, entries).unwrap();
    Registry::load(&path).unwrap()
}

#[test]
fn inline_flow_marker_wins_over_a_matching_registry_prefix() {
    let registry = registry_with(r#"{"deploy": "noop"}"#);
    let target = dispatch("deploy: run nested rollout <!-- type: flow -->", &registry);
    assert_eq!(target, DispatchTarget::Flow);
}

#[test]
fn registry_prefix_match_dispatches_to_that_atom() {
    let registry = registry_with(r#"{"deploy": "noop"}"#);
    let target = dispatch("deploy: push to staging", &registry);
    assert_eq!(target, DispatchTarget::Atom("deploy".to_string()));
}

#[test]
fn unmatched_prefix_falls_back_to_manual_intervention() {
    let registry = registry_with(r#"{"deploy": "noop"}"#);
    let target = dispatch("approve the release", &registry);
    assert_eq!(target, DispatchTarget::ManualIntervention);
}

#[test]
fn prefix_matching_is_case_sensitive() {
    let registry = registry_with(r#"{"deploy": "noop"}"#);
    let target = dispatch("Deploy: push to staging", &registry);
    assert_eq!(target, DispatchTarget::ManualIntervention);
}

#[test]
fn marker_embedded_via_zero_width_characters_is_still_detected() {
    let registry = registry_with(r#"{"deploy": "noop"}"#);
    let target = dispatch("deploy\u{200B}: rollout <!-- ty\u{200C}pe: flow -->", &registry);
    assert_eq!(target, DispatchTarget::Flow);
}

#[test]
fn name_opening_with_a_code_fence_never_triggers_marker_detection() {
    let registry = registry_with(r#"{}"#);
    let target = dispatch("```<!-- type: flow -->", &registry);
    assert_eq!(target, DispatchTarget::ManualIntervention);
}

#[test]
fn non_flow_marker_kind_is_ignored_and_falls_through_to_prefix_routing() {
    let registry = registry_with(r#"{"check": "noop"}"#);
    let target = dispatch("check: run tests <!-- type: note -->", &registry);
    assert_eq!(target, DispatchTarget::Atom("check".to_string()));
}
