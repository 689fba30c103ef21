// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::start::report;
use crate::exit_error::ExitError;
use flowctl_engine::Engine;
use std::path::Path;

pub fn run(start: &Path) -> anyhow::Result<()> {
    let mut engine = Engine::hydrate(start).map_err(ExitError::from)?;
    let outcome = engine.run_to_suspension().map_err(ExitError::from)?;
    report(outcome)
}
