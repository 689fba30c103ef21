// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event stream with blob spillover for oversized
//! payloads and size-based rotation. A single `parking_lot::Mutex` behind
//! every write gives the ordering guarantee the execution loop needs:
//! events are appended in the order they're emitted.

use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts_ms: u64,
    pub task_id: String,
    pub step_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    /// When true, this event's blob (if any) survives GC on a terminal
    /// workflow transition.
    #[serde(default)]
    pub preserve: bool,
}

#[derive(Serialize, Deserialize)]
struct StoredEvent {
    ts_ms: u64,
    task_id: String,
    step_id: String,
    kind: String,
    payload: serde_json::Value,
    #[serde(default)]
    preserve: bool,
}

pub struct EventLog {
    path: PathBuf,
    artifacts_dir: PathBuf,
    rotate_bytes: u64,
    blob_inline_max_bytes: usize,
    writer: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>, rotate_bytes: u64, blob_inline_max_bytes: usize) -> Self {
        EventLog {
            path: path.into(),
            artifacts_dir: artifacts_dir.into(),
            rotate_bytes,
            blob_inline_max_bytes,
            writer: Mutex::new(()),
        }
    }

    pub fn append(&self, event: &Event) -> EngineResult<()> {
        let _guard = self.writer.lock();

        let payload = match serde_json::to_vec(&event.payload) {
            Ok(encoded) if encoded.len() <= self.blob_inline_max_bytes => event.payload.clone(),
            Ok(_) => self.spill(event)?,
            Err(err) => serde_json::json!({ "truncated": true, "reason": err.to_string() }),
        };

        let stored = StoredEvent {
            ts_ms: event.ts_ms,
            task_id: event.task_id.clone(),
            step_id: event.step_id.clone(),
            kind: event.kind.clone(),
            payload,
            preserve: event.preserve,
        };

        let mut line = serde_json::to_vec(&stored).map_err(|source| EngineError::Json { path: self.path.clone(), source })?;
        line.push(b'\n');

        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EngineError::Io { path: self.path.clone(), source })?;
        file.write_all(&line).map_err(|source| EngineError::Io { path: self.path.clone(), source })?;
        file.sync_all().map_err(|source| EngineError::Io { path: self.path.clone(), source })?;
        Ok(())
    }

    fn spill(&self, event: &Event) -> EngineResult<serde_json::Value> {
        std::fs::create_dir_all(&self.artifacts_dir)
            .map_err(|source| EngineError::Io { path: self.artifacts_dir.clone(), source })?;
        let blob_name = format!("blob_{}.json", uuid::Uuid::new_v4());
        let blob_path = self.artifacts_dir.join(&blob_name);
        let bytes = serde_json::to_vec_pretty(&event.payload).map_err(|source| EngineError::Json { path: blob_path.clone(), source })?;
        std::fs::write(&blob_path, bytes).map_err(|source| EngineError::Io { path: blob_path, source })?;
        Ok(serde_json::json!({ "ref": blob_name }))
    }

    fn rotate_if_needed(&self) -> EngineResult<()> {
        let Ok(meta) = std::fs::metadata(&self.path) else { return Ok(()) };
        if meta.len() < self.rotate_bytes {
            return Ok(());
        }
        let mut n = 1u32;
        loop {
            let candidate = self.rotated_path(n);
            if !candidate.exists() {
                std::fs::rename(&self.path, &candidate).map_err(|source| EngineError::Io { path: candidate, source })?;
                return Ok(());
            }
            n += 1;
        }
    }

    fn rotated_path(&self, n: u32) -> PathBuf {
        let mut os_string = self.path.clone().into_os_string();
        os_string.push(format!(".{n}"));
        PathBuf::from(os_string)
    }

    /// Every JSONL file for this log: the active file first, then rotated
    /// files in ascending sequence order.
    fn all_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if self.path.exists() {
            files.push(self.path.clone());
        }
        let mut n = 1u32;
        loop {
            let candidate = self.rotated_path(n);
            if !candidate.exists() {
                break;
            }
            files.push(candidate);
            n += 1;
        }
        files
    }

    /// Delete blobs referenced by `task_id`'s own events, unless the
    /// emitting event carried `preserve = true`. Run when that task's
    /// workflow transitions to a terminal state.
    pub fn gc_blobs(&self, task_id: &str) -> EngineResult<usize> {
        let mut deleted = 0;
        for file in self.all_files() {
            let bytes = std::fs::read(&file).map_err(|source| EngineError::Io { path: file.clone(), source })?;
            for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                let Ok(stored) = serde_json::from_slice::<StoredEvent>(line) else { continue };
                if stored.task_id != task_id || stored.preserve {
                    continue;
                }
                let Some(blob_ref) = stored.payload.get("ref").and_then(|v| v.as_str()) else { continue };
                let blob_path = self.artifacts_dir.join(blob_ref);
                if std::fs::remove_file(&blob_path).is_ok() {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }
}

pub fn default_path(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join("events.jsonl")
}

pub fn default_artifacts_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("artifacts")
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
