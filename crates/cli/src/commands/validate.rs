// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use crate::output::{render, OutputFormat};
use flowctl_engine::Engine;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
}

pub fn run(start: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let engine = Engine::hydrate(start).map_err(ExitError::from)?;
    engine.validate().map_err(ExitError::from)?;
    render(format, &ValidationReport { valid: true }, || println!("ok: status document is valid"))
}
