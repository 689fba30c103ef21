// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand definitions and dispatch. Every handler takes the already-
//! discovered project root and the requested output format, hydrates its
//! own `Engine`, and returns `anyhow::Result<()>` so `?` can surface an
//! `ExitError` through the usual blanket conversion.

mod doctor;
mod reopen;
mod reset;
mod resume;
mod start;
mod status;
mod validate;

use crate::output::OutputFormat;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum Command {
    /// Run steps until the next suspension point (idle, waiting, or
    /// interrupted). With a task id, that task is activated first, taking
    /// priority over whichever pending leaf would otherwise run.
    Start {
        /// Dotted task id, e.g. `2.1`. Omit to continue wherever the
        /// document's existing active/pending fallback leaves off.
        task_id: Option<String>,
    },
    /// Run steps until the next suspension point, picking up wherever the
    /// status document and any crash-recovered intent lock left off.
    Resume,
    /// Print a flattened view of every task's id, name, and status.
    Status,
    /// Re-parse and re-validate the status document without mutating it.
    Validate,
    /// Revert a task (default: the active one) and its descendants to pending.
    Reset {
        /// Dotted task id, e.g. `2.1`. Defaults to the current active task.
        task_id: Option<String>,
    },
    /// Move a done task (and any done ancestors) back to active.
    Reopen {
        /// Dotted task id, e.g. `2.1`.
        task_id: String,
    },
    /// Re-run the boot-time integrity sweep (orphaned intent locks, broken
    /// registry entries) without otherwise touching the status document.
    Doctor,
}

pub fn dispatch(command: Command, start: &Path, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Start { task_id } => start::run(start, task_id.as_deref()),
        Command::Resume => resume::run(start),
        Command::Status => status::run(start, format),
        Command::Validate => validate::run(start, format),
        Command::Reset { task_id } => reset::run(start, task_id),
        Command::Reopen { task_id } => reopen::run(start, &task_id),
        Command::Doctor => doctor::run(start),
    }
}
