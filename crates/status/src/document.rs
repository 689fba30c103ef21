// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser and serializer for the indented checklist wire format.

use crate::error::{StatusError, StatusResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Maximum nesting depth accepted while parsing. Guards against pathological
/// input driving the loop-local indent counter without bound; the parser
/// itself never recurses on the host stack.
pub const MAX_PARSE_DEPTH: usize = 64;

#[allow(clippy::expect_used)]
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)- \[(?P<mark>[ /xX\-v])\] (?P<rest>.*)$")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<name>.*?)(?: @ (?:"(?P<qpath>[^"]*)"|(?P<path>\S+)))?$"#)
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<key>[^:]+): (?P<value>.*)$").expect("constant regex pattern is valid"));

/// Status of a single task node. `[v]`/`[X]` on read both normalize to
/// `Done`; `Done` always round-trips to the lowercase `x` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Active,
    Done,
    Skipped,
}

flowctl_core::simple_display! {
    Status {
        Pending => "pending",
        Active => "active",
        Done => "done",
        Skipped => "skipped",
    }
}

impl Status {
    fn from_marker(mark: char) -> Option<Self> {
        match mark {
            ' ' => Some(Status::Pending),
            '/' => Some(Status::Active),
            'x' | 'X' | 'v' => Some(Status::Done),
            '-' => Some(Status::Skipped),
            _ => None,
        }
    }

    fn write_marker(self) -> char {
        match self {
            Status::Pending => ' ',
            Status::Active => '/',
            Status::Done => 'x',
            Status::Skipped => '-',
        }
    }
}

/// A single checklist node. `name` is treated as opaque, immutable binary
/// data: never trimmed, normalized, or re-wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub status: Status,
    pub ref_path: Option<String>,
    /// Recorded at parse time; not authoritative for serialization, which
    /// always writes at the task's actual position in `children`.
    pub indent_level: usize,
    pub children: Vec<Task>,
}

impl Task {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Task { name: name.into(), status, ref_path: None, indent_level: 0, children: Vec::new() }
    }

    pub fn with_ref(mut self, ref_path: impl Into<String>) -> Self {
        self.ref_path = Some(ref_path.into());
        self
    }
}

/// The parsed document: an ordered header map plus a forest of tasks.
#[derive(Debug, Clone, Default)]
pub struct StatusDocument {
    /// Insertion-ordered, last-write-wins on duplicate keys.
    pub headers: Vec<(String, String)>,
    pub roots: Vec<Task>,
    pub had_bom: bool,
}

impl StatusDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(entry) = self.headers.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value.into();
        } else {
            self.headers.push((key, value.into()));
        }
    }

    /// Parse a `status.md`-shaped byte buffer.
    pub fn parse(bytes: &[u8]) -> StatusResult<Self> {
        let (had_bom, without_bom) = strip_bom(bytes);
        let text = std::str::from_utf8(without_bom)
            .map_err(|e| StatusError::validation(format!("invalid utf-8: {e}")))?;

        let mut doc = StatusDocument { had_bom, ..StatusDocument::default() };
        let mut lines = text.split('\n').peekable();
        // Normalize a trailing CR (CRLF input) per-line as we go.
        let normalize = |l: &str| l.strip_suffix('\r').unwrap_or(l).to_string();

        // Header region: consume `Key: Value` lines until a blank line or a
        // line that isn't a header line (including the first task line).
        let mut in_header = true;
        while in_header {
            let Some(raw) = lines.peek() else { break };
            let line = normalize(raw);
            if line.is_empty() {
                lines.next();
                break;
            }
            if is_comment_line(&line) {
                lines.next();
                continue;
            }
            match HEADER_RE.captures(&line) {
                Some(caps) => {
                    doc.set_header(caps["key"].to_string(), caps["value"].to_string());
                    lines.next();
                }
                None => in_header = false,
            }
        }

        // Body: an indent-stack-based forest builder. No host recursion.
        struct Frame {
            indent: usize,
            task: Task,
        }
        let mut stack: Vec<Frame> = Vec::new();
        let mut roots: Vec<Task> = Vec::new();

        let pop_to = |stack: &mut Vec<Frame>, roots: &mut Vec<Task>, indent: usize| loop {
            let should_pop = matches!(stack.last(), Some(top) if top.indent >= indent);
            if !should_pop {
                break;
            }
            if let Some(frame) = stack.pop() {
                push_into(stack, roots, frame.task);
            }
        };

        fn push_into(stack: &mut Vec<Frame>, roots: &mut Vec<Task>, task: Task) {
            if let Some(parent) = stack.last_mut() {
                parent.task.children.push(task);
            } else {
                roots.push(task);
            }
        }

        for raw in lines {
            let line = normalize(raw);
            if line.trim().is_empty() {
                continue;
            }
            if is_comment_line(line.trim_start()) {
                continue;
            }

            let Some(caps) = LINE_RE.captures(&line) else {
                if line.trim_start().starts_with("- ") {
                    return Err(StatusError::validation(format!(
                        "malformed task line (bad marker or indent): {line:?}"
                    )));
                }
                return Err(StatusError::validation(format!("unrecognized line in body: {line:?}")));
            };

            let indent_raw = &caps["indent"];
            if indent_raw.contains('\t') {
                return Err(StatusError::validation(format!(
                    "tabs are not permitted in indentation: {line:?}"
                )));
            }
            if indent_raw.len() % 4 != 0 {
                return Err(StatusError::validation(format!(
                    "indentation must be a multiple of 4 spaces: {line:?}"
                )));
            }
            let indent_level = indent_raw.len() / 4;
            if indent_level > MAX_PARSE_DEPTH {
                return Err(StatusError::validation(format!(
                    "nesting depth {indent_level} exceeds cap {MAX_PARSE_DEPTH}"
                )));
            }
            let mark = caps["mark"].chars().next().unwrap_or(' ');
            let status = Status::from_marker(mark)
                .ok_or_else(|| StatusError::validation(format!("unknown marker {mark:?}")))?;
            let rest = &caps["rest"];

            let ref_caps = REF_RE
                .captures(rest)
                .ok_or_else(|| StatusError::validation(format!("malformed task body: {rest:?}")))?;
            let name = ref_caps["name"].to_string();
            let ref_path = ref_caps
                .name("qpath")
                .or_else(|| ref_caps.name("path"))
                .map(|m| m.as_str().to_string());

            let task = Task { name, status, ref_path, indent_level, children: Vec::new() };

            pop_to(&mut stack, &mut roots, indent_level);

            // A child's indent must be exactly one level deeper than its
            // new parent's; skipping levels is a hierarchy error.
            match stack.last() {
                Some(top) if indent_level > top.indent + 1 => {
                    return Err(StatusError::validation(format!("indentation skips a level: {line:?}")));
                }
                None if indent_level > 0 => {
                    return Err(StatusError::validation(format!(
                        "first task at this position must be at indent level 0: {line:?}"
                    )));
                }
                _ => {}
            }

            stack.push(Frame { indent: indent_level, task });
        }
        while let Some(frame) = stack.pop() {
            push_into(&mut stack, &mut roots, frame.task);
        }

        doc.roots = roots;
        Ok(doc)
    }

    /// Serialize back to canonical bytes: strict 4-space indent, LF endings,
    /// UTF-8, canonical markers, headers first. Does not itself check the
    /// cross-node invariants in [`crate::tree`] — callers validate before
    /// calling this (see [`crate::tree::StatusTree::save`]).
    pub fn serialize(&self) -> StatusResult<Vec<u8>> {
        let mut out = String::new();
        if self.had_bom {
            out.push('\u{feff}');
        }
        for (key, value) in &self.headers {
            if key.contains(':') || key.contains('\n') || value.contains('\n') {
                return Err(StatusError::validation(format!(
                    "header {key:?} cannot be serialized (contains newline or colon in key)"
                )));
            }
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        if !self.headers.is_empty() {
            out.push('\n');
        }
        for root in &self.roots {
            write_task(&mut out, root, 0)?;
        }
        Ok(out.into_bytes())
    }
}

fn write_task(out: &mut String, task: &Task, depth: usize) -> StatusResult<()> {
    if task.name.contains('\n') {
        return Err(StatusError::validation("task name may not contain a newline"));
    }
    out.push_str(&" ".repeat(depth * 4));
    out.push_str("- [");
    out.push(task.status.write_marker());
    out.push_str("] ");
    out.push_str(&task.name);
    if let Some(path) = &task.ref_path {
        out.push_str(" @ ");
        if path.chars().any(char::is_whitespace) {
            out.push('"');
            out.push_str(path);
            out.push('"');
        } else {
            out.push_str(path);
        }
    }
    out.push('\n');
    for child in &task.children {
        write_task(out, child, depth + 1)?;
    }
    Ok(())
}

fn is_comment_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("<!--") && line.ends_with("-->")
}

fn strip_bom(bytes: &[u8]) -> (bool, &[u8]) {
    const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
    if bytes.starts_with(&BOM) {
        (true, &bytes[3..])
    } else {
        (false, bytes)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
