// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead intent records (`state/<task_id>.intent.lock`). Presence at
//! boot means the previous run crashed mid-step; a live owning PID means a
//! second process is already running this task.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRecord {
    pub task_id: String,
    pub step_id: String,
    pub attempt_n: u32,
    pub pid: u32,
    pub started_at_ms: u64,
}

pub fn lock_path(state_dir: &Path, task_id: &str) -> PathBuf {
    state_dir.join(format!("{task_id}.intent.lock"))
}

/// Write (or overwrite) the intent record for a step about to run.
pub fn write(state_dir: &Path, record: &IntentRecord) -> EngineResult<()> {
    let path = lock_path(state_dir, &record.task_id);
    let bytes = serde_json::to_vec_pretty(record).map_err(|source| EngineError::Json { path: path.clone(), source })?;
    std::fs::write(&path, bytes).map_err(|source| EngineError::Io { path, source })
}

pub fn delete(state_dir: &Path, task_id: &str) -> EngineResult<()> {
    let path = lock_path(state_dir, task_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(EngineError::Io { path, source }),
    }
}

fn read(path: &Path) -> EngineResult<Option<IntentRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).map_err(|source| EngineError::Io { path: path.to_path_buf(), source })?;
    let record = serde_json::from_slice(&bytes).map_err(|source| EngineError::Json { path: path.to_path_buf(), source })?;
    Ok(Some(record))
}

fn is_pid_alive(pid: u32) -> bool {
    let sysinfo_pid = Pid::from(pid as usize);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), false);
    system.process(sysinfo_pid).is_some()
}

/// Outcome of recovering a pre-existing intent lock for the task the engine
/// is about to dispatch.
pub enum Recovery {
    /// No lock existed; this is a fresh attempt.
    Clean,
    /// A lock existed with a dead owning PID: it was deleted and the
    /// returned count is the attempt number the next dispatch should use.
    Recovered { next_attempt: u32 },
}

/// Recover the intent lock for `task_id`, per the hydration contract: if the
/// lock's PID is alive, refuse to proceed; if dead, increment the attempt
/// counter and delete the lock.
pub fn recover(state_dir: &Path, task_id: &str) -> EngineResult<Recovery> {
    let path = lock_path(state_dir, task_id);
    let Some(record) = read(&path)? else {
        return Ok(Recovery::Clean);
    };
    if is_pid_alive(record.pid) {
        return Err(EngineError::TaskOwnedElsewhere(record.pid));
    }
    std::fs::remove_file(&path).map_err(|source| EngineError::Io { path, source })?;
    Ok(Recovery::Recovered { next_attempt: record.attempt_n + 1 })
}

/// Broad orphan scan (§11.3 doctoring): every `*.intent.lock` under
/// `state_dir` whose PID is dead, regardless of which task is about to run
/// next. Returns `(task_id, next_attempt)` for each cleared orphan, where
/// `next_attempt` is the recovered record's `attempt_n + 1` — the same
/// count `recover()` would have produced had this task's lock still been
/// present when it was dispatched. Losing this count here (rather than
/// carrying it forward to whoever dispatches the task next) would silently
/// reset every crash-then-reboot to attempt 1, defeating the circuit
/// breaker across process restarts.
pub fn scan_orphans(state_dir: &Path) -> EngineResult<Vec<(String, u32)>> {
    if !state_dir.exists() {
        return Ok(Vec::new());
    }
    let mut cleared = Vec::new();
    let entries =
        std::fs::read_dir(state_dir).map_err(|source| EngineError::Io { path: state_dir.to_path_buf(), source })?;
    for entry in entries {
        let entry = entry.map_err(|source| EngineError::Io { path: state_dir.to_path_buf(), source })?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(task_id) = file_name.strip_suffix(".intent.lock") else { continue };
        let Some(record) = read(&path)? else { continue };
        if !is_pid_alive(record.pid) {
            std::fs::remove_file(&path).map_err(|source| EngineError::Io { path: path.clone(), source })?;
            cleared.push((task_id.to_string(), record.attempt_n + 1));
        }
    }
    Ok(cleared)
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
