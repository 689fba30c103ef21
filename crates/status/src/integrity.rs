// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk custody of a status document: content-hash sidecar, rotated
//! backups, and tamper recovery. Never interprets the bytes it stores;
//! [`crate::document::StatusDocument`] and [`crate::tree::StatusTree`] own
//! the grammar and invariants.

use crate::error::{StatusError, StatusResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of rotated backups kept alongside the live file.
const DEFAULT_KEEP: u32 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct IntegrityMeta {
    sha256: String,
    backup: Option<String>,
}

/// Manages a single status file's sidecar hash and rotated backups.
///
/// Layout, given `status_path = dir/status.md`:
/// - `dir/status.md` - the live file
/// - `dir/status.meta` - sidecar `{"sha256": "...", "backup": "..."}`
/// - `dir/backups/status_<ts>.md` - rotated prior versions, named by the
///   millisecond epoch timestamp at rotation time
pub struct IntegrityStore {
    status_path: PathBuf,
    meta_path: PathBuf,
    backups_dir: PathBuf,
    keep: u32,
}

impl IntegrityStore {
    pub fn new(status_path: impl Into<PathBuf>) -> Self {
        let status_path = status_path.into();
        let meta_path = status_path.with_file_name("status.meta");
        let backups_dir = status_path.parent().unwrap_or_else(|| Path::new(".")).join("backups");
        IntegrityStore { status_path, meta_path, backups_dir, keep: DEFAULT_KEEP }
    }

    pub fn with_keep(mut self, keep: u32) -> Self {
        self.keep = keep.max(1);
        self
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Read the live file and check it against the recorded hash. A missing
    /// sidecar is not an error (first load of a freshly authored file); a
    /// present-but-mismatched sidecar is [`StatusError::Integrity`].
    pub fn load(&self) -> StatusResult<Vec<u8>> {
        let bytes = read_file(&self.status_path)?;
        if let Some(meta) = self.read_meta()? {
            let found = hash_hex(&bytes);
            if found != meta.sha256 {
                return Err(StatusError::Integrity { expected: meta.sha256, found });
            }
        }
        Ok(bytes)
    }

    /// Record `bytes` as trusted without touching the live file. Used after
    /// a caller has independently confirmed the on-disk content is sound
    /// (e.g. after a reconciled manual edit). Leaves the backup pointer
    /// untouched since no new backup was taken.
    pub fn accept(&self, bytes: &[u8]) -> StatusResult<()> {
        let backup = self.read_meta()?.and_then(|m| m.backup);
        self.write_meta(&hash_hex(bytes), backup)
    }

    /// Discard the live file and restore the backup named by the sidecar's
    /// `backup` pointer, re-hashing it as the new trusted content. Fails if
    /// no backup has ever been recorded or the pointed-to file is gone.
    pub fn decline(&self) -> StatusResult<Vec<u8>> {
        let backup_name = self
            .read_meta()?
            .and_then(|m| m.backup)
            .ok_or_else(|| StatusError::state("no backup available to decline to"))?;
        let backup_path = self.backups_dir.join(&backup_name);
        if !backup_path.exists() {
            return Err(StatusError::state("no backup available to decline to"));
        }
        let bytes = read_file(&backup_path)?;
        write_atomic(&self.status_path, &bytes)?;
        self.write_meta(&hash_hex(&bytes), Some(backup_name))?;
        Ok(bytes)
    }

    /// Write `bytes` as the new live content: rotate the current file into
    /// the backup directory first, then atomically replace it, then update
    /// the sidecar hash (and backup pointer) last so a crash mid-write never
    /// leaves a stale-but-matching hash.
    pub fn save(&self, bytes: &[u8]) -> StatusResult<()> {
        let backup_name = if self.status_path.exists() {
            let path = self.rotate_backup()?;
            path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        } else {
            self.read_meta()?.and_then(|m| m.backup)
        };
        write_atomic(&self.status_path, bytes)?;
        self.write_meta(&hash_hex(bytes), backup_name)?;
        Ok(())
    }

    /// Copy the current live file into `backups/` under a fresh
    /// timestamp-named path, prune anything beyond `keep`, and return the
    /// path written.
    fn rotate_backup(&self) -> StatusResult<PathBuf> {
        fs::create_dir_all(&self.backups_dir)
            .map_err(|source| StatusError::Io { path: self.backups_dir.clone(), source })?;

        let current = read_file(&self.status_path)?;
        let backup_path = self.next_backup_path();
        write_atomic(&backup_path, &current)?;
        self.prune_backups()?;
        Ok(backup_path)
    }

    fn stem(&self) -> &str {
        self.status_path.file_stem().and_then(|s| s.to_str()).unwrap_or("status")
    }

    /// A not-yet-taken `<stem>_<ts>.md` path under `backups_dir`, walking
    /// the millisecond timestamp forward on collision so two rotations in
    /// the same millisecond still get distinct, monotonically ordered names.
    fn next_backup_path(&self) -> PathBuf {
        let stem = self.stem();
        let mut ts = now_ms();
        loop {
            let candidate = self.backups_dir.join(format!("{stem}_{ts}.md"));
            if !candidate.exists() {
                return candidate;
            }
            ts += 1;
        }
    }

    fn prune_backups(&self) -> StatusResult<()> {
        let prefix = format!("{}_", self.stem());
        let entries = fs::read_dir(&self.backups_dir)
            .map_err(|source| StatusError::Io { path: self.backups_dir.clone(), source })?;

        let mut backups: Vec<(u128, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let name = path.file_name()?.to_str()?;
                let ts: u128 = name.strip_prefix(&prefix)?.strip_suffix(".md")?.parse().ok()?;
                Some((ts, path))
            })
            .collect();
        backups.sort_by_key(|(ts, _)| *ts);

        while backups.len() > self.keep as usize {
            let (_, path) = backups.remove(0);
            let _ = fs::remove_file(path);
        }
        Ok(())
    }

    fn read_meta(&self) -> StatusResult<Option<IntegrityMeta>> {
        if !self.meta_path.exists() {
            return Ok(None);
        }
        let bytes = read_file(&self.meta_path)?;
        let meta: IntegrityMeta = serde_json::from_slice(&bytes)
            .map_err(|e| StatusError::validation(format!("malformed integrity sidecar: {e}")))?;
        Ok(Some(meta))
    }

    fn write_meta(&self, sha256: &str, backup: Option<String>) -> StatusResult<()> {
        let meta = IntegrityMeta { sha256: sha256.to_string(), backup };
        let bytes = serde_json::to_vec_pretty(&meta)
            .map_err(|e| StatusError::validation(format!("failed to encode integrity sidecar: {e}")))?;
        write_atomic(&self.meta_path, &bytes)
    }
}

fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

fn hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_file(path: &Path) -> StatusResult<Vec<u8>> {
    fs::read(path).map_err(|source| StatusError::Io { path: path.to_path_buf(), source })
}

/// Write via a sibling temp file, fsync, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> StatusResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|source| StatusError::Io { path: dir.to_path_buf(), source })?;

    let tmp_name = format!(".{}.tmp", path.file_name().and_then(|n| n.to_str()).unwrap_or("status"));
    let tmp_path = dir.join(tmp_name);

    let mut file =
        fs::File::create(&tmp_path).map_err(|source| StatusError::Io { path: tmp_path.clone(), source })?;
    file.write_all(bytes).map_err(|source| StatusError::Io { path: tmp_path.clone(), source })?;
    file.sync_all().map_err(|source| StatusError::Io { path: tmp_path.clone(), source })?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| StatusError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
