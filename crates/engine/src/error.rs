// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for hydration, dispatch, and the execution loop.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no marker directory found in {0} or any ancestor")]
    RootNotFound(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error("atom {0:?} is not registered")]
    UnknownAtom(String),

    #[error("step contract violation: {0}")]
    ContractViolation(String),

    #[error("circuit breaker tripped for task {task_id:?} step {step_id:?} after {attempts} attempts")]
    FatalRetryExceeded { task_id: String, step_id: String, attempts: u32 },

    #[error("another process (pid {0}) already owns this task")]
    TaskOwnedElsewhere(u32),

    #[error(transparent)]
    Status(#[from] flowctl_status::StatusError),

    #[error(transparent)]
    Loom(#[from] flowctl_loom::LoomError),

    #[error(transparent)]
    SafePath(#[from] flowctl_safepath::SafePathError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        EngineError::ContractViolation(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
