// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use flowctl_engine::{Engine, RunOutcome};
use std::path::Path;

/// Print the outcome of a `run_to_suspension` call and translate
/// `Interrupted` into the SIGINT exit code (130); `Idle` and `Waiting`
/// are both ordinary, successful stopping points.
pub(crate) fn report(outcome: RunOutcome) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::Idle => {
            println!("idle: nothing pending or active");
            Ok(())
        }
        RunOutcome::Waiting => {
            println!("waiting: a step needs manual intervention before this can continue");
            Ok(())
        }
        RunOutcome::Interrupted => Err(ExitError::new(130, "interrupted").into()),
    }
}

pub fn run(start: &Path, task_id: Option<&str>) -> anyhow::Result<()> {
    let mut engine = Engine::hydrate(start).map_err(ExitError::from)?;
    engine.start_task(task_id).map_err(ExitError::from)?;
    let outcome = engine.run_to_suspension().map_err(ExitError::from)?;
    report(outcome)
}
