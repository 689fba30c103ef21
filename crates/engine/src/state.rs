// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task resume state, persisted atomically under `state/`. Nested
//! sub-workflows get their own file keyed by the parent chain
//! (`<id>#<sub_id>.json`, `sub_id` itself dotted for deeper nesting);
//! the engine walks that chain to find the leaf to resume.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Ready,
    InProgress,
    Completed,
    Waiting,
    Error,
    Interrupted,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepHistoryEntry {
    pub step_id: String,
    pub status: StepStatus,
    pub started_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub retry_count: u32,
    pub export_digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSummary {
    pub step_id: String,
    pub attempt_n: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub task_id: String,
    pub current_step_index: usize,
    #[serde(default)]
    pub context_cache: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub steps_history: Vec<StepHistoryEntry>,
    pub intent_lock: Option<IntentSummary>,
    pub parent_ref: Option<String>,
}

impl WorkflowState {
    pub fn new(task_id: impl Into<String>) -> Self {
        WorkflowState {
            task_id: task_id.into(),
            current_step_index: 0,
            context_cache: BTreeMap::new(),
            steps_history: Vec::new(),
            intent_lock: None,
            parent_ref: None,
        }
    }
}

pub struct StatePersister {
    state_dir: PathBuf,
}

impl StatePersister {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        StatePersister { state_dir: state_dir.into() }
    }

    fn file_name(task_id: &str, sub_id: Option<&str>) -> String {
        match sub_id {
            Some(sub_id) => format!("{task_id}#{sub_id}.json"),
            None => format!("{task_id}.json"),
        }
    }

    fn path_for(&self, task_id: &str, sub_id: Option<&str>) -> PathBuf {
        self.state_dir.join(Self::file_name(task_id, sub_id))
    }

    /// Load state for `task_id` (optionally nested under `sub_id`). A file
    /// that fails to parse (corrupt or truncated, e.g. after a crash mid
    /// write) is treated as absent rather than a fatal error, with a loud
    /// warning — resume falls back to a fresh start for that task.
    pub fn load(&self, task_id: &str, sub_id: Option<&str>) -> Option<WorkflowState> {
        let path = self.path_for(task_id, sub_id);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "state file is corrupt or truncated; treating as absent");
                None
            }
        }
    }

    /// Two-phase atomic write: `<id>.tmp` -> fsync -> rename over
    /// `<id>.json`. On failure, fall back to a panic-save dump so the
    /// previous on-disk state (never unlinked) stays intact.
    pub fn save(&self, state: &WorkflowState, sub_id: Option<&str>) -> Result<(), EngineError> {
        match self.try_save(state, sub_id) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.panic_save(state, sub_id, &err);
                Err(err)
            }
        }
    }

    fn try_save(&self, state: &WorkflowState, sub_id: Option<&str>) -> Result<(), EngineError> {
        std::fs::create_dir_all(&self.state_dir)
            .map_err(|source| EngineError::Io { path: self.state_dir.clone(), source })?;
        let path = self.path_for(&state.task_id, sub_id);
        let tmp_path = path.with_extension("tmp");

        let bytes = serde_json::to_vec_pretty(state).map_err(|source| EngineError::Json { path: path.clone(), source })?;
        std::fs::write(&tmp_path, &bytes).map_err(|source| EngineError::Io { path: tmp_path.clone(), source })?;
        {
            let file = std::fs::File::open(&tmp_path).map_err(|source| EngineError::Io { path: tmp_path.clone(), source })?;
            file.sync_all().map_err(|source| EngineError::Io { path: tmp_path.clone(), source })?;
        }
        std::fs::rename(&tmp_path, &path).map_err(|source| EngineError::Io { path, source })?;
        Ok(())
    }

    /// Emergency path when the atomic save itself fails (e.g. ENOSPC): dump
    /// a compact record to stderr and to `<id>.crash.json`, without ever
    /// touching the previous `<id>.json`.
    fn panic_save(&self, state: &WorkflowState, sub_id: Option<&str>, cause: &EngineError) {
        let dump = serde_json::json!({
            "task_id": state.task_id,
            "current_step_index": state.current_step_index,
            "save_error": cause.to_string(),
        });
        eprintln!("flowctl: emergency state dump: {dump}");

        let crash_name = match sub_id {
            Some(sub_id) => format!("{}#{sub_id}.crash.json", state.task_id),
            None => format!("{}.crash.json", state.task_id),
        };
        let crash_path = self.state_dir.join(crash_name);
        if let Ok(bytes) = serde_json::to_vec_pretty(&dump) {
            let _ = std::fs::write(crash_path, bytes);
        }
    }

    /// Whether a state file exists for `task_id` (optionally nested under
    /// `sub_id`), without attempting to parse it.
    pub fn exists(&self, task_id: &str, sub_id: Option<&str>) -> bool {
        self.path_for(task_id, sub_id).exists()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
