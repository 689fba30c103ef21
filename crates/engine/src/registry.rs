// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The whitelist of atom names the engine is permitted to dispatch to.
//! Anything not listed here does not exist to the engine, mirroring the
//! teacher's explicit-registry stance on dynamic dispatch (no filesystem-scan
//! import).

use crate::error::{EngineError, EngineResult};
use flowctl_atoms::{Atom, ManualInterventionAtom, NoopAtom, ScopedToolWrapper, ShellAtom};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Status of one registry entry after the startup consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntryStatus {
    Ok,
    /// The named implementation id didn't resolve to a concrete atom.
    Broken(String),
}

struct Entry {
    implementation_id: String,
    atom: Option<Arc<dyn Atom>>,
}

/// Loaded `flow.registry.json` plus the instantiated atoms behind each name.
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    /// Parse `flow.registry.json` (a flat object of name -> implementation
    /// id) and instantiate each implementation once. An implementation that
    /// fails to resolve is recorded as `Broken` rather than aborting load —
    /// dispatching to it later fails cleanly instead of killing the engine.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| EngineError::Io { path: path.to_path_buf(), source })?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| EngineError::Json { path: path.to_path_buf(), source })?;
        let object = value
            .as_object()
            .ok_or_else(|| EngineError::config(format!("{} must contain a JSON object", path.display())))?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));

        let mut entries = BTreeMap::new();
        for (name, value) in object {
            let implementation_id = value
                .as_str()
                .ok_or_else(|| EngineError::config(format!("registry entry {name:?} must be a string")))?
                .to_string();
            let atom = instantiate(&implementation_id, root);
            entries.insert(name.clone(), Entry { implementation_id, atom });
        }
        Ok(Registry { entries })
    }

    pub fn entry_status(&self, name: &str) -> Option<RegistryEntryStatus> {
        let entry = self.entries.get(name)?;
        Some(match &entry.atom {
            Some(_) => RegistryEntryStatus::Ok,
            None => RegistryEntryStatus::Broken(entry.implementation_id.clone()),
        })
    }

    pub fn resolve(&self, name: &str) -> EngineResult<Arc<dyn Atom>> {
        let entry = self.entries.get(name).ok_or_else(|| EngineError::UnknownAtom(name.to_string()))?;
        entry
            .atom
            .clone()
            .ok_or_else(|| EngineError::config(format!("atom {name:?} ({}) is broken", entry.implementation_id)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn broken_entries(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(name, entry)| entry.atom.is_none().then_some((name.as_str(), entry.implementation_id.as_str())))
            .collect()
    }
}

/// The fixed set of implementation ids the engine ships with. A real
/// deployment's `flow.registry.json` may only reference these names; the
/// shell one additionally requires a `shell:` path suffix, resolved through
/// [`ScopedToolWrapper`] against `root` (the data directory) so a registry
/// entry can never point a `ShellAtom` at a script outside the jail.
fn instantiate(implementation_id: &str, root: &Path) -> Option<Arc<dyn Atom>> {
    if implementation_id == "noop" {
        return Some(Arc::new(NoopAtom));
    }
    if implementation_id == "manual_intervention" {
        return Some(Arc::new(ManualInterventionAtom::new("manual intervention required")));
    }
    if let Some(script) = implementation_id.strip_prefix("shell:") {
        if script.is_empty() {
            return None;
        }
        let scope = ScopedToolWrapper::new("shell", root, &[]);
        let script_path = scope.resolve_path(script).ok()?;
        return Some(Arc::new(ShellAtom::new(implementation_id.to_string(), script_path)));
    }
    None
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
