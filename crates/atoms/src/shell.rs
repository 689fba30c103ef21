// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An atom that shells out to a validation script (`test.sh`, `run.sh`, ...)
//! and maps its exit status to an [`AtomResult`].
//!
//! The engine's execution loop is synchronous; this is the one place
//! `tokio` appears in this crate. Each invocation builds its own
//! current-thread runtime and blocks on it, mirroring how a synchronous
//! caller would shell out with [`std::process::Command`] if tokio's richer
//! timeout/kill-on-drop semantics weren't needed.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::atom::Atom;
use crate::result::{AtomContext, AtomEvent, AtomResult};

/// Default ceiling on how long a shelled-out script may run before it is
/// killed and the step reported as `Failure`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ShellAtom {
    name: String,
    script_path: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ShellAtom {
    pub fn new(name: impl Into<String>, script_path: impl Into<PathBuf>) -> Self {
        ShellAtom { name: name.into(), script_path: script_path.into(), args: Vec::new(), timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self) -> AtomResult {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(err) => return AtomResult::error(format!("failed to start runtime: {err}")),
        };
        runtime.block_on(self.run_async())
    }

    async fn run_async(&self) -> AtomResult {
        let mut command = tokio::process::Command::new(&self.script_path);
        command.args(&self.args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => return AtomResult::error(format!("failed to spawn {}: {err}", self.script_path.display())),
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let code = output.status.code().unwrap_or(-1);
                let result = if output.status.success() { AtomResult::success() } else { AtomResult::failure() };
                result
                    .with_export("exit_code", serde_json::json!(code))
                    .with_event(AtomEvent::new("stdout", serde_json::json!({ "text": stdout })))
                    .with_event(AtomEvent::new("stderr", serde_json::json!({ "text": stderr })))
            }
            Ok(Err(err)) => AtomResult::error(format!("wait failed for {}: {err}", self.script_path.display())),
            Err(_) => AtomResult::error(format!(
                "{} exceeded timeout of {:?} and was killed",
                self.script_path.display(),
                self.timeout
            )),
        }
    }
}

impl Atom for ShellAtom {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, _ctx: &AtomContext<'_>) -> AtomResult {
        self.run()
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
