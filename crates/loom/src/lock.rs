// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory per-file locking with stale-lock recovery.
//!
//! Mirrors the daemon lock-file startup idiom (write the PID, hold an fs2
//! exclusive lock) but scoped to a single edited file and bounded by a
//! deadline rather than failing outright on contention.

use crate::error::{LoomError, LoomResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An acquired exclusive lock on `<path>.lock`. Released (and the marker
/// file removed) on drop.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, retrying until `acquire_timeout` elapses. A lock
    /// file whose mtime is older than `stale_after` is treated as abandoned
    /// by a crashed writer and forcibly replaced.
    pub fn acquire(path: &Path, acquire_timeout: Duration, stale_after: Duration) -> LoomResult<Self> {
        let deadline = Instant::now() + acquire_timeout;
        loop {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(|source| LoomError::Io { path: path.to_path_buf(), source })?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let mut file = file;
                    // Truncate and write our PID; this also bumps mtime so the
                    // lock's age is measured from the moment we took it.
                    file.set_len(0).map_err(|source| LoomError::Io { path: path.to_path_buf(), source })?;
                    let _ = writeln!(file, "{}", std::process::id());
                    let _ = file.sync_all();
                    return Ok(FileLock { file, path: path.to_path_buf() });
                }
                Err(_) => {
                    drop(file);
                    if is_stale(path, stale_after) {
                        tracing::warn!(path = %path.display(), "replacing stale lock file");
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(LoomError::ResourceBusy(path.to_path_buf()));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let Ok(meta) = fs::metadata(path) else { return false };
    let Ok(modified) = meta.modified() else { return false };
    modified.elapsed().map(|age| age > stale_after).unwrap_or(false)
}

/// The sibling lock-marker path for an edited file.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    target.with_file_name(name)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
