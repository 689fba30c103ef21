// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::result::AtomStatus;

#[test]
fn call_always_waits_and_emits_needs_human() {
    let atom = ManualInterventionAtom::new("approve the deploy");
    let context = serde_json::Map::new();
    let ctx = AtomContext { task_id: "t1", step_id: "approve", context: &context };

    let result = atom.call(&ctx);

    assert_eq!(result.status, AtomStatus::Waiting);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].kind, "needs_human");
    assert_eq!(result.events[0].payload["step_id"], "approve");
    assert_eq!(result.events[0].payload["prompt"], "approve the deploy");
}

#[test]
fn name_identifies_the_atom() {
    let atom = ManualInterventionAtom::new("x");
    assert_eq!(atom.name(), "manual_intervention");
}
