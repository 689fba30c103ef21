// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for surgical file editing.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoomError {
    #[error("permission denied: {0:?} is outside the declared whitelist")]
    PermissionDenied(PathBuf),

    #[error("security violation: {0}")]
    Security(String),

    #[error("match count mismatch: expected {expected}, found {actual}")]
    Uniqueness { expected: usize, actual: usize },

    #[error("resource busy: could not acquire lock on {0:?} within the deadline")]
    ResourceBusy(PathBuf),

    #[error("content changed: {0:?} was modified by another writer during the edit")]
    ContentChanged(PathBuf),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("file too large: {size} bytes exceeds the {limit} byte cap")]
    TooLarge { size: u64, limit: u64 },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SafePath(#[from] flowctl_safepath::SafePathError),
}

pub type LoomResult<T> = Result<T, LoomError>;
