// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `config.json` schema. Every field defaults so a partial file (or an
//! absent one, which is treated as `{}`) is valid.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_marker_dirs() -> Vec<String> {
    vec![".flow".to_string()]
}

fn default_data_dir() -> String {
    ".flow".to_string()
}

fn default_status_file() -> String {
    "status.md".to_string()
}

fn default_retry_bound() -> u32 {
    3
}

fn default_recursion_cap() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    pub lock_timeout_ms: u64,
    pub stale_lock_secs: u64,
    pub max_file_bytes: u64,
}

impl Default for LoomConfig {
    fn default() -> Self {
        LoomConfig { lock_timeout_ms: 5_000, stale_lock_secs: 30, max_file_bytes: 50 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub rotate_bytes: u64,
    pub blob_inline_max_bytes: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        EventLogConfig { rotate_bytes: 10 * 1024 * 1024, blob_inline_max_bytes: 8192 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    pub keep: u32,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        BackupsConfig { keep: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScopeConfig {
    pub role: String,
    pub tool_allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_marker_dirs")]
    pub marker_dirs: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_status_file")]
    pub status_file: String,
    #[serde(default = "default_retry_bound")]
    pub retry_bound: u32,
    #[serde(default = "default_recursion_cap")]
    pub recursion_cap: u32,
    pub loom: LoomConfig,
    pub event_log: EventLogConfig,
    pub backups: BackupsConfig,
    pub scope: ScopeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            marker_dirs: default_marker_dirs(),
            data_dir: default_data_dir(),
            status_file: default_status_file(),
            retry_bound: default_retry_bound(),
            recursion_cap: default_recursion_cap(),
            loom: LoomConfig::default(),
            event_log: EventLogConfig::default(),
            backups: BackupsConfig::default(),
            scope: ScopeConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.json` from `path`. A missing file is treated as an
    /// all-defaults config; malformed JSON or a non-object root is a fatal
    /// `ConfigError`.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let bytes = std::fs::read(path).map_err(|source| EngineError::Io { path: path.to_path_buf(), source })?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| EngineError::Json { path: path.to_path_buf(), source })?;
        if !value.is_object() {
            return Err(EngineError::config(format!("{} must contain a JSON object", path.display())));
        }
        serde_json::from_value(value).map_err(|source| EngineError::Json { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
