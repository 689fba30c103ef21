// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shape every [`crate::Atom`] invocation returns.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomStatus {
    Success,
    Failure,
    Error,
    Waiting,
}

/// One record destined for the EventLog, emitted by an atom invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomEvent {
    pub kind: String,
    pub payload: serde_json::Value,
}

impl AtomEvent {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        AtomEvent { kind: kind.into(), payload }
    }
}

/// The read-only context snapshot an atom is invoked with. `context` is a
/// `MappingProxy`-equivalent: atoms observe it but export changes only
/// through [`AtomResult::exports`], which the engine merges afterward.
pub struct AtomContext<'a> {
    pub task_id: &'a str,
    pub step_id: &'a str,
    pub context: &'a serde_json::Map<String, serde_json::Value>,
}

/// What an atom invocation produced. `exports` keys beginning with `config.`
/// or `system.` are discarded by the engine before merge — an atom cannot
/// overwrite engine-owned state.
#[derive(Debug, Clone)]
pub struct AtomResult {
    pub status: AtomStatus,
    pub exports: BTreeMap<String, serde_json::Value>,
    pub events: Vec<AtomEvent>,
}

impl AtomResult {
    fn with_status(status: AtomStatus) -> Self {
        AtomResult { status, exports: BTreeMap::new(), events: Vec::new() }
    }

    pub fn success() -> Self {
        Self::with_status(AtomStatus::Success)
    }

    pub fn failure() -> Self {
        Self::with_status(AtomStatus::Failure)
    }

    pub fn waiting() -> Self {
        Self::with_status(AtomStatus::Waiting)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(AtomStatus::Error).with_event(AtomEvent::new(
            "error",
            serde_json::json!({ "message": message.into() }),
        ))
    }

    pub fn with_export(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.exports.insert(key.into(), value);
        self
    }

    pub fn with_event(mut self, event: AtomEvent) -> Self {
        self.events.push(event);
        self
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
