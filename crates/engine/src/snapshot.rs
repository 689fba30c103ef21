// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only flattened view over a status document, for the `status` CLI
//! subcommand: never mutates, never touches the process lock for writing.

use flowctl_status::{Status, StatusTree, Task};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub ref_path: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub generation: u64,
    pub tasks: Vec<TaskSnapshot>,
}

impl StatusSnapshot {
    pub fn build(tree: &StatusTree) -> Self {
        let mut tasks = Vec::new();
        flatten(tree.roots(), "", 0, &mut tasks);
        StatusSnapshot { generation: tree.generation(), tasks }
    }
}

fn flatten(level: &[Task], prefix: &str, depth: usize, out: &mut Vec<TaskSnapshot>) {
    for (i, task) in level.iter().enumerate() {
        let id = if prefix.is_empty() { (i + 1).to_string() } else { format!("{prefix}.{}", i + 1) };
        out.push(TaskSnapshot {
            id: id.clone(),
            name: task.name.clone(),
            status: task.status,
            ref_path: task.ref_path.clone(),
            depth,
        });
        flatten(&task.children, &id, depth + 1, out);
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
