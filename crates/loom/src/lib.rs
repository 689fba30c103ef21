// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Surgical, anchor-based text editing with advisory locking, an optimistic
//! mtime fence, and ReDoS-guarded matching. Every path flows through
//! [`flowctl_safepath`] before it is touched.

pub mod edit;
pub mod error;
mod lock;

pub use edit::{Edit, EditOp, MatchMode, Position};
pub use error::{LoomError, LoomResult};

use lock::{lock_path_for, FileLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_STALE_LOCK: Duration = Duration::from_secs(30);
const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Root-jailed surgical editor. One `Loom` is typically shared by every atom
/// that is allowed to touch files under `root`.
pub struct Loom {
    root: PathBuf,
    lock_timeout: Duration,
    stale_lock: Duration,
    max_file_bytes: u64,
}

impl Loom {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Loom {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock: DEFAULT_STALE_LOCK,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_stale_lock(mut self, stale_after: Duration) -> Self {
        self.stale_lock = stale_after;
        self
    }

    pub fn with_max_file_bytes(mut self, max_bytes: u64) -> Self {
        self.max_file_bytes = max_bytes;
        self
    }

    pub fn insert(&self, path: &str, anchor: &str, content: &str, position: Position) -> LoomResult<()> {
        self.apply(path, &[Edit::insert(anchor, content, position)])
    }

    pub fn replace_block(&self, path: &str, start_marker: &str, end_marker: &str, content: &str) -> LoomResult<()> {
        self.apply(path, &[Edit::replace_block(start_marker, end_marker, content)])
    }

    pub fn append(&self, path: &str, content: &str) -> LoomResult<()> {
        self.apply(path, &[Edit::append(content)])
    }

    /// Apply every edit in `edits` to `path`, all-or-nothing. `path` is
    /// relative to `root` and flows through SafePath; a path escaping the
    /// whitelisted root surfaces as [`LoomError::SafePath`] rather than
    /// [`LoomError::PermissionDenied`], since SafePath itself is the single
    /// path guard used by every caller of `Loom`.
    pub fn apply(&self, path: &str, edits: &[Edit]) -> LoomResult<()> {
        let resolved = flowctl_safepath::resolve(&self.root, path)?;

        let meta = fs::metadata(&resolved).map_err(|source| LoomError::Io { path: resolved.clone(), source })?;
        if meta.len() > self.max_file_bytes {
            return Err(LoomError::TooLarge { size: meta.len(), limit: self.max_file_bytes });
        }

        let lock_path = lock_path_for(&resolved);
        let _lock = FileLock::acquire(&lock_path, self.lock_timeout, self.stale_lock)?;

        let fence_before = mtime_ns(&resolved)?;
        let raw = fs::read(&resolved).map_err(|source| LoomError::Io { path: resolved.clone(), source })?;
        let (had_bom, without_bom) = strip_bom(&raw);
        let text = std::str::from_utf8(without_bom)
            .map_err(|e| LoomError::Encoding(format!("{} is not valid UTF-8: {e}", resolved.display())))?;
        let is_crlf = text.contains("\r\n");
        let mut buffer = text.replace("\r\n", "\n");

        for edit in edits {
            buffer = edit::apply_one(&buffer, edit)?;
        }

        let fence_after = mtime_ns(&resolved)?;
        if fence_before != fence_after {
            return Err(LoomError::ContentChanged(resolved));
        }

        let mut out_text = if is_crlf { buffer.replace('\n', "\r\n") } else { buffer };
        if had_bom {
            out_text.insert(0, '\u{feff}');
        }
        write_atomic(&resolved, out_text.as_bytes())
    }
}

fn mtime_ns(path: &Path) -> LoomResult<u128> {
    let meta = fs::metadata(path).map_err(|source| LoomError::Io { path: path.to_path_buf(), source })?;
    let modified = meta.modified().map_err(|source| LoomError::Io { path: path.to_path_buf(), source })?;
    Ok(modified.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos())
}

fn strip_bom(bytes: &[u8]) -> (bool, &[u8]) {
    const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
    if bytes.starts_with(&BOM) {
        (true, &bytes[3..])
    } else {
        (false, bytes)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> LoomResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_name = format!(".{}.tmp", path.file_name().and_then(|n| n.to_str()).unwrap_or("loom"));
    let tmp_path = dir.join(tmp_name);

    fs::write(&tmp_path, bytes).map_err(|source| LoomError::Io { path: tmp_path.clone(), source })?;
    {
        let file = fs::File::open(&tmp_path).map_err(|source| LoomError::Io { path: tmp_path.clone(), source })?;
        file.sync_all().map_err(|source| LoomError::Io { path: tmp_path.clone(), source })?;
    }
    fs::rename(&tmp_path, path).map_err(|source| LoomError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
