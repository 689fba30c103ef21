// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use flowctl_engine::Engine;
use std::path::Path;

pub fn run(start: &Path, task_id: &str) -> anyhow::Result<()> {
    let mut engine = Engine::hydrate(start).map_err(ExitError::from)?;
    engine.reopen_task(task_id).map_err(ExitError::from)?;
    println!("reopened: {task_id}");
    Ok(())
}
