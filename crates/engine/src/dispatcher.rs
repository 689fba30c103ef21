// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smart routing from a task name to what should run it: an inline intent
//! marker wins over a registry prefix match, which in turn wins over
//! falling back to manual intervention.

use crate::registry::Registry;
use regex::Regex;
use std::sync::mpsc;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;

const PREFIX_TIMEOUT: Duration = Duration::from_millis(100);

#[allow(clippy::expect_used)]
static INTENT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*type:\s*(?P<kind>[A-Za-z0-9_]+)\s*-->").expect("constant regex is valid"));

#[allow(clippy::expect_used)]
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>[^:\s]+)").expect("constant regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    /// The task names a nested sub-workflow; the engine should descend
    /// into its `ref` rather than invoke a registered atom.
    Flow,
    Atom(String),
    ManualIntervention,
}

/// Strip zero-width characters (U+200B..U+200D, U+FEFF) that could be used
/// to smuggle a marker past a naive substring check.
fn strip_zero_width(input: &str) -> String {
    input.chars().filter(|c| !matches!(*c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')).nfc().collect()
}

fn run_with_timeout<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> Option<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(PREFIX_TIMEOUT).ok()
}

/// Look for an intent marker (`<!-- type: flow -->`) in `name`. Markers are
/// matched at the whole-name level, never inside a fenced code block — a
/// name that itself opens with a code fence is never treated as carrying a
/// marker.
fn extract_intent_marker(name: &str) -> Option<String> {
    if name.trim_start().starts_with("```") {
        return None;
    }
    let normalized = strip_zero_width(name);
    let captures = INTENT_MARKER_RE.captures(&normalized)?;
    Some(captures.name("kind")?.as_str().to_lowercase())
}

fn extract_prefix(name: &str) -> Option<String> {
    let normalized = strip_zero_width(name);
    let captures = PREFIX_RE.captures(&normalized)?;
    Some(captures.name("prefix")?.as_str().to_string())
}

/// Route `name` to a dispatch target. Registry lookups are case-sensitive.
pub fn dispatch(name: &str, registry: &Registry) -> DispatchTarget {
    let owned = name.to_string();
    if let Some(Some(kind)) = run_with_timeout(move || extract_intent_marker(&owned)) {
        if kind == "flow" {
            return DispatchTarget::Flow;
        }
    }

    let owned = name.to_string();
    let prefix = run_with_timeout(move || extract_prefix(&owned)).flatten();
    match prefix {
        Some(prefix) if registry.contains(&prefix) => DispatchTarget::Atom(prefix),
        _ => DispatchTarget::ManualIntervention,
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
