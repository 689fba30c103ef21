// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use flowctl_engine::Engine;
use std::path::Path;

pub fn run(start: &Path, task_id: Option<String>) -> anyhow::Result<()> {
    let mut engine = Engine::hydrate(start).map_err(ExitError::from)?;
    engine.reset_task(task_id.as_deref()).map_err(ExitError::from)?;
    println!("reset: {}", task_id.as_deref().unwrap_or("active task"));
    Ok(())
}
