// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::result::AtomStatus;

#[test]
fn call_always_succeeds() {
    let atom = NoopAtom;
    let context = serde_json::Map::new();
    let ctx = AtomContext { task_id: "t1", step_id: "s1", context: &context };

    let result = atom.call(&ctx);

    assert_eq!(result.status, AtomStatus::Success);
    assert!(result.exports.is_empty());
    assert!(result.events.is_empty());
}
