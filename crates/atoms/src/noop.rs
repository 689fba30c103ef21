// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A step bound to this atom always succeeds immediately. Useful for
//! placeholder steps, fan-in join points, and test fixtures.

use crate::atom::Atom;
use crate::result::{AtomContext, AtomResult};

#[derive(Default)]
pub struct NoopAtom;

impl Atom for NoopAtom {
    fn name(&self) -> &str {
        "noop"
    }

    fn call(&self, _ctx: &AtomContext<'_>) -> AtomResult {
        AtomResult::success()
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
