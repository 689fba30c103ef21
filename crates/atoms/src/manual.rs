// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A step bound to this atom never completes on its own: it parks the task
//! in `Waiting` until an operator resolves it out-of-band (CLI `resume` with
//! an export override, or a direct status edit).

use crate::atom::Atom;
use crate::result::{AtomContext, AtomEvent, AtomResult};

pub struct ManualInterventionAtom {
    prompt: String,
}

impl ManualInterventionAtom {
    pub fn new(prompt: impl Into<String>) -> Self {
        ManualInterventionAtom { prompt: prompt.into() }
    }
}

impl Atom for ManualInterventionAtom {
    fn name(&self) -> &str {
        "manual_intervention"
    }

    fn call(&self, ctx: &AtomContext<'_>) -> AtomResult {
        AtomResult::waiting().with_event(AtomEvent::new(
            "needs_human",
            serde_json::json!({
                "task_id": ctx.task_id,
                "step_id": ctx.step_id,
                "prompt": self.prompt,
            }),
        ))
    }
}

#[cfg(test)]
#[path = "manual_tests.rs"]
mod tests;
