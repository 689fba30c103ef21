// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowctl`: the thin CLI wrapper around `flowctl-engine`. Parses
//! arguments, wires up logging, resolves the project root, and maps every
//! command's terminal error onto the process exit code table.

mod color;
mod commands;
mod exit_error;
mod output;

use clap::Parser;
use exit_error::ExitError;
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "flowctl", version, about = "Workflow orchestration engine", styles = color::styles())]
struct Cli {
    /// Render output as JSON instead of text.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Increase log verbosity (stacks: -v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: commands::Command,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// The engine discovers its root by scanning ancestors for marker
/// directories; the only environment-variable-driven exception is an
/// explicit `ROOT` override, read here and nowhere else.
fn start_dir() -> anyhow::Result<PathBuf> {
    if let Ok(root) = std::env::var("ROOT") {
        return Ok(PathBuf::from(root));
    }
    std::env::current_dir().map_err(|e| anyhow::anyhow!("cannot determine current directory: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    flowctl_engine::signal::install();

    let start = match start_dir() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    match commands::dispatch(cli.command, &start, cli.output) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            let exit = err
                .downcast_ref::<ExitError>()
                .map(|e| (e.code, e.message.clone()))
                .unwrap_or_else(|| (1, err.to_string()));
            eprintln!("error: {}", exit.1);
            ExitCode::from(exit.0 as u8)
        }
    }
}
