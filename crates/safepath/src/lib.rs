// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flowctl-safepath: the single path resolver used by every file-touching
//! component in the workflow engine (status document loads, Loom edits,
//! atom-visible file access).
//!
//! [`resolve`] is the only supported entry point. It rejects null bytes,
//! absolute inputs, `..` components, UNC prefixes, reserved device names,
//! and anything whose resolved realpath escapes the jail root or crosses a
//! filesystem boundary.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Maximum path length (bytes) accepted before [`resolve`] gives up.
pub const MAX_PATH_LEN: usize = 4096;

/// Maximum symlink resolution depth, guarding against symlink loops.
const MAX_SYMLINK_DEPTH: u32 = 40;

#[cfg(windows)]
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Errors produced while resolving a path beneath a jail root.
#[derive(Debug, Error)]
pub enum SafePathError {
    #[error("path contains a null byte")]
    NullByte,

    #[error("path too long ({0} bytes, max {MAX_PATH_LEN})")]
    PathTooLong(usize),

    #[error("jail root {0} does not exist")]
    RootNotFound(PathBuf),

    #[error("jail root {0} exists but is not a directory")]
    InvalidRoot(PathBuf),

    #[error("security violation: {0}")]
    Security(String),

    #[error("io error resolving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve `input` (a relative, user-supplied path fragment) to an absolute
/// path strictly beneath `root`.
///
/// `root` itself must already exist and be a directory. `input` is rejected
/// outright (before any filesystem access) if it:
/// - contains a NUL byte,
/// - is absolute,
/// - contains a `..` component after lexical normalization,
/// - is a UNC path or names a Windows reserved device (`CON`, `NUL`, ...),
/// - or exceeds [`MAX_PATH_LEN`] bytes.
///
/// After the lexical check, the path is resolved component-by-component
/// (capped at [`MAX_SYMLINK_DEPTH`] symlink hops) and the result is
/// re-verified to live under the canonical root and on the same device.
pub fn resolve(root: &Path, input: &str) -> Result<PathBuf, SafePathError> {
    if input.len() > MAX_PATH_LEN {
        return Err(SafePathError::PathTooLong(input.len()));
    }
    if input.as_bytes().contains(&0) {
        return Err(SafePathError::NullByte);
    }
    reject_protocol_prefixes(input)?;

    let candidate = Path::new(input);
    if candidate.is_absolute() {
        return Err(SafePathError::Security(format!("absolute path rejected: {input}")));
    }
    if is_unc_like(input) {
        return Err(SafePathError::Security(format!("UNC path rejected: {input}")));
    }

    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => {
                reject_reserved_device_name(part)?;
                normalized.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SafePathError::Security(format!(
                    "parent-directory traversal rejected: {input}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SafePathError::Security(format!("absolute path rejected: {input}")));
            }
        }
    }

    let canonical_root = canonicalize_root(root)?;
    let joined = canonical_root.join(&normalized);
    let resolved = resolve_symlinks_within(&joined, &canonical_root)?;

    if !resolved.starts_with(&canonical_root) {
        return Err(SafePathError::Security(format!(
            "resolved path escapes root: {}",
            resolved.display()
        )));
    }

    #[cfg(unix)]
    same_device(&canonical_root, &resolved)?;

    Ok(resolved)
}

fn canonicalize_root(root: &Path) -> Result<PathBuf, SafePathError> {
    if !root.exists() {
        return Err(SafePathError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(SafePathError::InvalidRoot(root.to_path_buf()));
    }
    canonicalize(root)
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafePathError> {
    #[cfg(windows)]
    {
        dunce::canonicalize(path).map_err(|source| SafePathError::Io { path: path.to_path_buf(), source })
    }
    #[cfg(not(windows))]
    {
        path.canonicalize().map_err(|source| SafePathError::Io { path: path.to_path_buf(), source })
    }
}

/// Resolve `joined` component-by-component relative to `root`, following
/// any symlinks encountered (each hop re-verified against the root) up to
/// [`MAX_SYMLINK_DEPTH`] hops. Components that don't yet exist on disk
/// (the common case — the caller is about to create the file) are passed
/// through untouched.
fn resolve_symlinks_within(joined: &Path, root: &Path) -> Result<PathBuf, SafePathError> {
    let mut resolved = root.to_path_buf();
    let suffix = joined.strip_prefix(root).unwrap_or(joined);

    for part in suffix.components() {
        let Component::Normal(part) = part else { continue };
        resolved.push(part);

        let mut depth = 0;
        while let Ok(meta) = resolved.symlink_metadata() {
            if !meta.file_type().is_symlink() {
                break;
            }
            depth += 1;
            if depth > MAX_SYMLINK_DEPTH {
                return Err(SafePathError::Security(format!(
                    "symlink resolution depth exceeded at {}",
                    resolved.display()
                )));
            }
            let target = std::fs::read_link(&resolved)
                .map_err(|source| SafePathError::Io { path: resolved.clone(), source })?;
            resolved = if target.is_absolute() { target } else { resolved.parent().unwrap_or(root).join(target) };
            if !resolved.starts_with(root) {
                return Err(SafePathError::Security(format!(
                    "symlink escapes root: {}",
                    resolved.display()
                )));
            }
        }
    }

    Ok(resolved)
}

#[cfg(unix)]
fn same_device(root: &Path, resolved: &Path) -> Result<(), SafePathError> {
    use std::os::unix::fs::MetadataExt;

    let root_dev = root.metadata().map(|m| m.dev()).ok();
    // Walk up to the nearest existing ancestor of `resolved` (it may not
    // exist yet — Loom and StatusTree both resolve paths before creating
    // the target file).
    let mut probe = resolved.to_path_buf();
    let resolved_dev = loop {
        match probe.metadata() {
            Ok(meta) => break Some(meta.dev()),
            Err(_) => {
                if !probe.pop() {
                    break None;
                }
            }
        }
    };

    if let (Some(a), Some(b)) = (root_dev, resolved_dev) {
        if a != b {
            return Err(SafePathError::Security(format!(
                "path crosses filesystem boundary: {}",
                resolved.display()
            )));
        }
    }
    Ok(())
}

fn is_unc_like(input: &str) -> bool {
    input.starts_with("\\\\") || input.starts_with("//")
}

fn reject_protocol_prefixes(input: &str) -> Result<(), SafePathError> {
    let lower = input.to_ascii_lowercase();
    for proto in ["javascript:", "data:", "file:", "http:", "https:"] {
        if lower.starts_with(proto) {
            return Err(SafePathError::Security(format!("protocol prefix rejected: {input}")));
        }
    }
    Ok(())
}

fn reject_reserved_device_name(part: &std::ffi::OsStr) -> Result<(), SafePathError> {
    #[cfg(windows)]
    {
        if let Some(s) = part.to_str() {
            let stem = s.split('.').next().unwrap_or(s).to_ascii_uppercase();
            if RESERVED_DEVICE_NAMES.contains(&stem.as_str()) {
                return Err(SafePathError::Security(format!(
                    "reserved device name rejected: {s}"
                )));
            }
        }
    }
    #[cfg(not(windows))]
    {
        let _ = part;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
