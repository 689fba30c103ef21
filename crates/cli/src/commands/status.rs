// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::color;
use crate::exit_error::ExitError;
use crate::output::{render, OutputFormat};
use flowctl_engine::Engine;
use std::path::Path;

pub fn run(start: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let engine = Engine::hydrate(start).map_err(ExitError::from)?;
    let snapshot = engine.status_snapshot().map_err(ExitError::from)?;

    render(format, &snapshot, || {
        println!("{}", color::header(&format!("status.md (generation {})", snapshot.generation)));
        for task in &snapshot.tasks {
            let indent = "  ".repeat(task.depth);
            let marker = match task.status {
                flowctl_status::Status::Pending => " ",
                flowctl_status::Status::Active => "/",
                flowctl_status::Status::Done => "x",
                flowctl_status::Status::Skipped => "-",
            };
            let suffix = task.ref_path.as_deref().map(|p| format!(" {}", color::muted(&format!("@ {p}")))).unwrap_or_default();
            println!("{indent}[{marker}] {} {}{suffix}", color::muted(&task.id), task.name);
        }
    })
}
