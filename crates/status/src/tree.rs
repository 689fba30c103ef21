// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed, virtual-ID-addressed view over a [`StatusDocument`] plus the
//! CRUD layer that enforces the cross-node invariants: single focus,
//! ancestor/descendant status agreement, and sibling-name uniqueness.

use crate::document::{Status, StatusDocument, Task};
use crate::error::{StatusError, StatusResult};
use std::collections::HashSet;
use std::path::Path;

/// A checklist document plus the bookkeeping needed to address nodes by
/// virtual ID and detect when a previously-valid ID has gone stale.
pub struct StatusTree {
    document: StatusDocument,
    generation: u64,
    /// Every virtual ID that has ever been valid, across all generations.
    /// Used to distinguish "never existed" (`IDError`) from "existed before
    /// a mutation moved or removed it" (`StaleIDError`).
    ever_valid_ids: HashSet<String>,
}

impl StatusTree {
    /// Parse and fully validate (invariants 1-8) a document. `data_dir` is
    /// the root that every task `ref` must resolve beneath.
    pub fn load(bytes: &[u8], data_dir: &Path) -> StatusResult<Self> {
        let document = StatusDocument::parse(bytes)?;
        validate_structure(&document.roots)?;
        validate_refs(&document.roots, data_dir)?;

        let mut tree = StatusTree { document, generation: 0, ever_valid_ids: HashSet::new() };
        let ids: Vec<String> = tree.build_index().into_keys().collect();
        tree.ever_valid_ids.extend(ids);
        Ok(tree)
    }

    pub fn from_document(document: StatusDocument) -> StatusResult<Self> {
        validate_structure(&document.roots)?;
        let mut tree = StatusTree { document, generation: 0, ever_valid_ids: HashSet::new() };
        let ids: Vec<String> = tree.build_index().into_keys().collect();
        tree.ever_valid_ids.extend(ids);
        Ok(tree)
    }

    pub fn roots(&self) -> &[Task] {
        &self.document.roots
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.document.headers
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-validate every structural invariant (1, 3-6) against the current
    /// in-memory tree, and the ref-path invariants (7-8) against `data_dir`.
    pub fn validate(&self, data_dir: &Path) -> StatusResult<()> {
        validate_structure(&self.document.roots)?;
        validate_refs(&self.document.roots, data_dir)
    }

    /// Canonical bytes for this tree. Re-checks structural invariants first
    /// so a caller can never persist an inconsistent document.
    pub fn serialize(&self) -> StatusResult<Vec<u8>> {
        validate_structure(&self.document.roots)?;
        self.document.serialize()
    }

    fn build_index(&self) -> std::collections::HashMap<String, Vec<usize>> {
        let mut map = std::collections::HashMap::new();
        index_level(&self.document.roots, "", &mut Vec::new(), &mut map);
        map
    }

    fn locate(&self, id: &str) -> StatusResult<Vec<usize>> {
        match self.build_index().remove(id) {
            Some(path) => Ok(path),
            None if self.ever_valid_ids.contains(id) => Err(StatusError::StaleId(id.to_string())),
            None => Err(StatusError::Id(id.to_string())),
        }
    }

    /// Find a task by its virtual dotted ID.
    pub fn find(&mut self, id: &str) -> StatusResult<&Task> {
        let path = self.locate(id)?;
        self.remember_current_ids();
        task_at(&self.document.roots, &path).ok_or_else(|| StatusError::Id(id.to_string()))
    }

    fn remember_current_ids(&mut self) {
        let ids: Vec<String> = self.build_index().into_keys().collect();
        self.ever_valid_ids.extend(ids);
    }

    /// The deepest active task (the "fractal zoom" target within this single
    /// document), falling back to the document-order-first `PENDING` leaf
    /// (Smart Resume) if nothing is active. Returns the task's virtual ID
    /// alongside the task itself.
    pub fn get_active_task(&self) -> Option<(String, &Task)> {
        deepest_active(&self.document.roots, "").or_else(|| first_pending_leaf(&self.document.roots, ""))
    }

    /// Append (`index = None`) or insert at a 0-based position among
    /// `parent_id`'s children (`None` for a top-level root).
    pub fn add_task(
        &mut self,
        parent_id: Option<&str>,
        name: impl Into<String>,
        status: Status,
        index: Option<usize>,
    ) -> StatusResult<String> {
        let name = name.into();
        let parent_path = parent_id.map(|id| self.locate(id)).transpose()?;
        let mut doc = self.document.clone();

        let siblings = match &parent_path {
            None => &mut doc.roots,
            Some(path) => {
                let parent = task_at_mut(&mut doc.roots, path)
                    .ok_or_else(|| StatusError::Id(parent_id.unwrap_or_default().to_string()))?;
                &mut parent.children
            }
        };
        if siblings.iter().any(|t| t.name == name) {
            return Err(StatusError::validation(format!("duplicate sibling task name {name:?}")));
        }
        let insert_at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(insert_at, Task::new(name, status));

        validate_structure(&doc.roots)?;
        self.commit(doc);

        let mut new_path = parent_path.unwrap_or_default();
        new_path.push(insert_at);
        Ok(path_to_id(&new_path))
    }

    /// Update a task's name and/or status. `context_anchor`, if given, must
    /// equal the task's current name or the call is rejected with
    /// `AnchorError` without applying any change.
    pub fn update_task(
        &mut self,
        id: &str,
        name: Option<String>,
        status: Option<Status>,
        context_anchor: Option<&str>,
    ) -> StatusResult<()> {
        let path = self.locate(id)?;
        let mut doc = self.document.clone();

        {
            let task = task_at(&doc.roots, &path).ok_or_else(|| StatusError::Id(id.to_string()))?;
            if let Some(anchor) = context_anchor {
                if task.name != anchor {
                    return Err(StatusError::Anchor { expected: anchor.to_string(), actual: task.name.clone() });
                }
            }
        }

        if let Some(new_status) = status {
            if new_status == Status::Active {
                check_activation_preconditions(&doc.roots, &path)?;
            }
        }

        if let Some(new_name) = &name {
            let sibling_dup = siblings_of(&doc.roots, &path)
                .map(|siblings| {
                    siblings
                        .iter()
                        .enumerate()
                        .any(|(i, t)| i != *path.last().unwrap_or(&0) && &t.name == new_name)
                })
                .unwrap_or(false);
            if sibling_dup {
                return Err(StatusError::validation(format!("duplicate sibling task name {new_name:?}")));
            }
        }

        {
            let task = task_at_mut(&mut doc.roots, &path).ok_or_else(|| StatusError::Id(id.to_string()))?;
            if let Some(new_name) = name {
                task.name = new_name;
            }
            if let Some(new_status) = status {
                task.status = new_status;
            }
        }

        if status == Some(Status::Done) {
            reconcile_from(&mut doc, path.clone());
        }

        validate_structure(&doc.roots)?;
        self.commit(doc);
        Ok(())
    }

    /// Remove a task. Re-indexing (and therefore virtual-ID stability) is
    /// deferred to the next `find`/mutation — removal itself does not
    /// renumber siblings eagerly.
    pub fn remove_task(&mut self, id: &str) -> StatusResult<()> {
        let path = self.locate(id)?;
        let mut doc = self.document.clone();

        let (parent_path, idx) = path.split_at(path.len() - 1);
        let idx = idx[0];
        match parent_path {
            [] => {
                if idx >= doc.roots.len() {
                    return Err(StatusError::Id(id.to_string()));
                }
                doc.roots.remove(idx);
            }
            _ => {
                let parent = task_at_mut(&mut doc.roots, parent_path).ok_or_else(|| StatusError::Id(id.to_string()))?;
                if idx >= parent.children.len() {
                    return Err(StatusError::Id(id.to_string()));
                }
                parent.children.remove(idx);
            }
        }

        reconcile_from(&mut doc, path.clone());
        validate_structure(&doc.roots)?;
        self.commit(doc);
        Ok(())
    }

    fn commit(&mut self, doc: StatusDocument) {
        self.document = doc;
        self.generation += 1;
        self.remember_current_ids();
    }
}

fn siblings_of<'a>(roots: &'a [Task], path: &[usize]) -> Option<&'a [Task]> {
    if path.len() <= 1 {
        Some(roots)
    } else {
        task_at(roots, &path[..path.len() - 1]).map(|t| t.children.as_slice())
    }
}

fn check_activation_preconditions(roots: &[Task], path: &[usize]) -> StatusResult<()> {
    let this_idx = *path.last().unwrap_or(&0);
    if let Some(siblings) = siblings_of(roots, path) {
        if siblings.iter().enumerate().any(|(i, t)| i != this_idx && t.status == Status::Active) {
            return Err(StatusError::state("cannot activate: a sibling task is already active"));
        }
    }
    if path.len() > 1 {
        let parent_path = &path[..path.len() - 1];
        let parent = task_at(roots, parent_path).ok_or_else(|| StatusError::state("parent task not found"))?;
        if parent.status != Status::Active {
            return Err(StatusError::state("cannot activate: parent task is not active"));
        }
    }
    Ok(())
}

/// After a child transitions (to `Done`, or away entirely via removal),
/// walk upward from its parent applying the completion/activation bubble:
/// if every child is now `Done`/`Skipped` (with at least one `Done`), the
/// parent becomes `Done` too and the check continues upward; otherwise, if
/// the parent was still `Pending`, it is promoted to `Active` (work is
/// underway beneath it) and bubbling stops.
fn reconcile_from(doc: &mut StatusDocument, mut path: Vec<usize>) {
    loop {
        if path.is_empty() {
            return;
        }
        path.pop();
        if path.is_empty() {
            return;
        }
        let Some(parent) = task_at_mut(&mut doc.roots, &path) else { return };
        if parent.children.is_empty() {
            return;
        }
        let all_done_or_skipped =
            parent.children.iter().all(|c| matches!(c.status, Status::Done | Status::Skipped));
        let any_done = parent.children.iter().any(|c| c.status == Status::Done);

        if all_done_or_skipped && any_done {
            if parent.status == Status::Done {
                return;
            }
            parent.status = Status::Done;
            continue;
        }
        if parent.status == Status::Pending {
            parent.status = Status::Active;
        }
        return;
    }
}

fn index_level(
    tasks: &[Task],
    prefix: &str,
    path: &mut Vec<usize>,
    map: &mut std::collections::HashMap<String, Vec<usize>>,
) {
    for (i, t) in tasks.iter().enumerate() {
        let id = child_id(prefix, i);
        path.push(i);
        map.insert(id.clone(), path.clone());
        index_level(&t.children, &id, path, map);
        path.pop();
    }
}

fn child_id(prefix: &str, i: usize) -> String {
    if prefix.is_empty() {
        (i + 1).to_string()
    } else {
        format!("{prefix}.{}", i + 1)
    }
}

fn path_to_id(path: &[usize]) -> String {
    path.iter().map(|i| (i + 1).to_string()).collect::<Vec<_>>().join(".")
}

fn task_at<'a>(tasks: &'a [Task], path: &[usize]) -> Option<&'a Task> {
    let (first, rest) = path.split_first()?;
    let t = tasks.get(*first)?;
    if rest.is_empty() { Some(t) } else { task_at(&t.children, rest) }
}

fn task_at_mut<'a>(tasks: &'a mut [Task], path: &[usize]) -> Option<&'a mut Task> {
    let (first, rest) = path.split_first()?;
    let t = tasks.get_mut(*first)?;
    if rest.is_empty() { Some(t) } else { task_at_mut(&mut t.children, rest) }
}

fn deepest_active<'a>(tasks: &'a [Task], prefix: &str) -> Option<(String, &'a Task)> {
    for (i, t) in tasks.iter().enumerate() {
        if t.status == Status::Active {
            let id = child_id(prefix, i);
            return deepest_active(&t.children, &id).or(Some((id, t)));
        }
    }
    None
}

fn first_pending_leaf<'a>(tasks: &'a [Task], prefix: &str) -> Option<(String, &'a Task)> {
    for (i, t) in tasks.iter().enumerate() {
        let id = child_id(prefix, i);
        if t.children.is_empty() {
            if t.status == Status::Pending {
                return Some((id, t));
            }
        } else if let Some(found) = first_pending_leaf(&t.children, &id) {
            return Some(found);
        }
    }
    None
}

/// Invariants 3 (single focus), 4 (active ancestor chain), 5 (done implies
/// done/skipped descendants), and 6 (sibling name uniqueness).
fn validate_structure(roots: &[Task]) -> StatusResult<()> {
    validate_level(roots, true)
}

fn validate_level(tasks: &[Task], parent_active: bool) -> StatusResult<()> {
    let mut seen_names = HashSet::new();
    let mut active_seen = false;
    for t in tasks {
        if !seen_names.insert(t.name.as_str()) {
            return Err(StatusError::validation(format!("duplicate sibling task name {:?}", t.name)));
        }
        if t.status == Status::Active {
            if active_seen {
                return Err(StatusError::validation(
                    "Ambiguous Focus: more than one active task among siblings",
                ));
            }
            active_seen = true;
            if !parent_active {
                return Err(StatusError::validation(format!(
                    "task {:?} is active but its parent is not",
                    t.name
                )));
            }
        }
        if t.status == Status::Done {
            check_done_descendants(&t.children)?;
        }
    }
    for t in tasks {
        validate_level(&t.children, t.status == Status::Active)?;
    }
    Ok(())
}

fn check_done_descendants(tasks: &[Task]) -> StatusResult<()> {
    for t in tasks {
        if !matches!(t.status, Status::Done | Status::Skipped) {
            return Err(StatusError::validation(format!(
                "task {:?} must be Done or Skipped: its parent is Done",
                t.name
            )));
        }
        check_done_descendants(&t.children)?;
    }
    Ok(())
}

/// Invariants 7-8: every `ref` is a safe path under `data_dir`, and (for the
/// active task specifically) the referenced sub-document must exist. Full
/// recursive validation of the sub-document's own invariants happens where
/// it's loaded (the engine's fractal-zoom traversal), not here.
fn validate_refs(tasks: &[Task], data_dir: &Path) -> StatusResult<()> {
    for t in tasks {
        if let Some(r) = &t.ref_path {
            match flowctl_safepath::resolve(data_dir, r) {
                Ok(resolved) => {
                    if t.status == Status::Active && !resolved.exists() {
                        return Err(StatusError::validation(format!(
                            "active task {:?} references missing sub-status file {:?}",
                            t.name, r
                        )));
                    }
                }
                Err(e) => {
                    return Err(StatusError::validation(format!("Jailbreak attempt: {e}")));
                }
            }
        }
        validate_refs(&t.children, data_dir)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
