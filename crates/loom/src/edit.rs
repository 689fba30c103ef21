// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Edit descriptions and the matching/splicing logic that applies them to
//! an in-memory buffer. Never touches the filesystem; [`crate::Loom`] owns
//! locking, the mtime fence, and the atomic write.

use crate::error::{LoomError, LoomResult};
use regex::Regex;
use std::sync::mpsc;
use std::time::Duration;

/// How long a single regex search is allowed to run before it is treated as
/// a denial-of-service attempt.
const REGEX_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Regex,
}

#[derive(Debug, Clone)]
pub enum EditOp {
    Insert { position: Position },
    ReplaceBlock { end_spec: String },
    Append,
}

/// One edit in a (possibly multi-edit) [`crate::Loom::apply`] call.
///
/// `spec` is the anchor (`Insert`), the start marker (`ReplaceBlock`), or
/// unused (`Append`). `count` is the number of matches `spec` must have
/// under `match_mode`; the whole call aborts if it doesn't, per edit.
#[derive(Debug, Clone)]
pub struct Edit {
    pub op: EditOp,
    pub match_mode: MatchMode,
    pub spec: String,
    pub content: String,
    pub count: usize,
}

impl Edit {
    pub fn insert(anchor: impl Into<String>, content: impl Into<String>, position: Position) -> Self {
        Edit {
            op: EditOp::Insert { position },
            match_mode: MatchMode::Exact,
            spec: anchor.into(),
            content: content.into(),
            count: 1,
        }
    }

    pub fn replace_block(
        start_marker: impl Into<String>,
        end_marker: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Edit {
            op: EditOp::ReplaceBlock { end_spec: end_marker.into() },
            match_mode: MatchMode::Exact,
            spec: start_marker.into(),
            content: content.into(),
            count: 1,
        }
    }

    pub fn append(content: impl Into<String>) -> Self {
        Edit { op: EditOp::Append, match_mode: MatchMode::Exact, spec: String::new(), content: content.into(), count: 0 }
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Apply one edit to `buffer` (LF-normalized) and return the new buffer.
pub(crate) fn apply_one(buffer: &str, edit: &Edit) -> LoomResult<String> {
    match &edit.op {
        EditOp::Append => {
            let mut out = buffer.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&edit.content);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            Ok(out)
        }
        EditOp::Insert { position } => {
            let matches = find_matches(buffer, &edit.spec, edit.match_mode)?;
            if matches.len() != edit.count {
                return Err(LoomError::Uniqueness { expected: edit.count, actual: matches.len() });
            }
            let mut out = buffer.to_string();
            for &(start, end) in matches.iter().rev() {
                let at = match position {
                    Position::Before => start,
                    Position::After => end,
                };
                let mut piece = edit.content.clone();
                if !piece.ends_with('\n') {
                    piece.push('\n');
                }
                out.insert_str(at, &piece);
            }
            Ok(out)
        }
        EditOp::ReplaceBlock { end_spec } => {
            let starts = find_matches(buffer, &edit.spec, edit.match_mode)?;
            if starts.len() != edit.count {
                return Err(LoomError::Uniqueness { expected: edit.count, actual: starts.len() });
            }
            let (start, start_end) = starts[0];
            let ends = find_matches(&buffer[start_end..], end_spec, edit.match_mode)?;
            let Some(&(rel_end_start, rel_end_end)) = ends.first() else {
                return Err(LoomError::Uniqueness { expected: 1, actual: 0 });
            };
            let _ = rel_end_start;
            let block_end = start_end + rel_end_end;
            let mut out = String::with_capacity(buffer.len() + edit.content.len());
            out.push_str(&buffer[..start]);
            out.push_str(&edit.content);
            if !edit.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&buffer[block_end..]);
            Ok(out)
        }
    }
}

/// Find non-overlapping occurrences of `spec` in `buffer`, returning byte
/// ranges. `Exact` mode matches whole lines, lenient on trailing whitespace
/// and tabs-vs-spaces indentation. `Regex` mode matches the pattern as an
/// inline substring, bounded by [`REGEX_TIMEOUT`].
fn find_matches(buffer: &str, spec: &str, mode: MatchMode) -> LoomResult<Vec<(usize, usize)>> {
    match mode {
        MatchMode::Exact => Ok(find_matches_exact(buffer, spec)),
        MatchMode::Regex => find_matches_regex(buffer, spec),
    }
}

fn find_matches_exact(buffer: &str, spec: &str) -> Vec<(usize, usize)> {
    let lines = line_spans(buffer);
    let spec_lines: Vec<String> = spec.split('\n').map(normalize_line).collect();
    if spec_lines.is_empty() || lines.len() < spec_lines.len() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for i in 0..=(lines.len() - spec_lines.len()) {
        let window_matches =
            (0..spec_lines.len()).all(|j| normalize_line(lines[i + j].2) == spec_lines[j]);
        if window_matches {
            let start = lines[i].0;
            let end = lines[i + spec_lines.len() - 1].1;
            matches.push((start, end));
        }
    }
    matches
}

fn find_matches_regex(buffer: &str, pattern: &str) -> LoomResult<Vec<(usize, usize)>> {
    let re = Regex::new(pattern).map_err(|e| LoomError::Security(format!("invalid regex pattern: {e}")))?;
    let owned = buffer.to_string();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let found: Vec<(usize, usize)> = re.find_iter(&owned).map(|m| (m.start(), m.end())).collect();
        let _ = tx.send(found);
    });
    rx.recv_timeout(REGEX_TIMEOUT)
        .map_err(|_| LoomError::Security("regex match exceeded the timeout budget".to_string()))
}

/// `(start, end_including_trailing_newline_or_eof, content_without_newline)`
/// for each line in `buffer`.
fn line_spans(buffer: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let bytes = buffer.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            spans.push((start, i + 1, &buffer[start..i]));
            start = i + 1;
        }
    }
    if start < buffer.len() {
        spans.push((start, buffer.len(), &buffer[start..]));
    }
    spans
}

fn normalize_line(line: &str) -> String {
    let expanded: String =
        line.chars().flat_map(|c| if c == '\t' { vec![' '; 4] } else { vec![c] }).collect();
    expanded.trim_end().to_string()
}

#[cfg(test)]
#[path = "edit_tests.rs"]
mod tests;
