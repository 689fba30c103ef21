// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::color;
use crate::exit_error::ExitError;
use flowctl_engine::Engine;
use std::path::Path;

pub fn run(start: &Path) -> anyhow::Result<()> {
    let engine = Engine::hydrate(start).map_err(ExitError::from)?;
    let report = engine.doctor_report();

    if report.broken_atoms.is_empty() && report.cleared_orphans.is_empty() {
        println!("{}", color::muted("clean: no broken registry entries, no orphaned intent locks"));
        return Ok(());
    }

    for (name, implementation_id) in &report.broken_atoms {
        println!("broken atom: {name} -> {implementation_id}");
    }
    for (task_id, next_attempt) in &report.cleared_orphans {
        println!("cleared orphaned intent lock: {task_id} (attempt {next_attempt} carried forward)");
    }
    Ok(())
}
