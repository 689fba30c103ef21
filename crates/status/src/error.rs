// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the status-document subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, validating, or mutating a status document.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("security violation: {0}")]
    Security(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("integrity error: content hash mismatch (expected {expected}, found {found})")]
    Integrity { expected: String, found: String },

    #[error("state error: {0}")]
    State(String),

    #[error("anchor error: expected current name {expected:?}, got {actual:?}")]
    Anchor { expected: String, actual: String },

    #[error("no task with id {0:?}")]
    Id(String),

    #[error("stale id {0:?}: tree was mutated since this id was last valid")]
    StaleId(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SafePath(#[from] flowctl_safepath::SafePathError),
}

impl StatusError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StatusError::Validation(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        StatusError::Security(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        StatusError::State(msg.into())
    }
}

pub type StatusResult<T> = Result<T, StatusError>;
