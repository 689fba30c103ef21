// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role + path-whitelist gate for atom-visible capabilities, mirroring the
//! teacher's per-owner capability checks that route events by `OwnerId`.
//! The registry resolves a `ShellAtom`'s script path through a
//! `ScopedToolWrapper` at instantiation time, before the atom is ever
//! handed to the dispatcher; `check_tool` is available to any future atom
//! that needs to gate a bare command name the same way.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("path resolution failed: {0}")]
    Path(#[from] flowctl_safepath::SafePathError),

    #[error("command `{0}` is not in the tool allowlist for role `{1}`")]
    CommandNotAllowed(String, String),
}

/// A named role plus the set of shell commands an atom bound to it may
/// invoke. Paths are gated separately, by delegating every resolution to
/// [`flowctl_safepath::resolve`] against `root`.
pub struct ScopedToolWrapper<'a> {
    role: &'a str,
    root: &'a Path,
    tool_allowlist: &'a [String],
}

impl<'a> ScopedToolWrapper<'a> {
    pub fn new(role: &'a str, root: &'a Path, tool_allowlist: &'a [String]) -> Self {
        ScopedToolWrapper { role, root, tool_allowlist }
    }

    /// Resolve `input` to an absolute path beneath `root`, the only path any
    /// atom under this wrapper is permitted to see.
    pub fn resolve_path(&self, input: &str) -> Result<PathBuf, ScopeError> {
        flowctl_safepath::resolve(self.root, input).map_err(ScopeError::from)
    }

    /// Confirm `command` is present in this role's allowlist before an atom
    /// is allowed to spawn it.
    pub fn check_tool(&self, command: &str) -> Result<(), ScopeError> {
        if self.tool_allowlist.iter().any(|allowed| allowed == command) {
            Ok(())
        } else {
            Err(ScopeError::CommandNotAllowed(command.to_string(), self.role.to_string()))
        }
    }

    pub fn role(&self) -> &str {
        self.role
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
