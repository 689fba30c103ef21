// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution loop: hydration, the fetch/circuit-breaker/dispatch/
//! post-step cycle, fractal zoom through `ref`-linked sub-documents, and
//! signal-driven suspension. Everything above this module is a building
//! block; this is where they're wired into the thing that actually runs
//! a workflow.

use crate::config::Config;
use crate::dispatcher::{self, DispatchTarget};
use crate::error::{EngineError, EngineResult};
use crate::event_log::{self, Event as LogEvent, EventLog};
use crate::hydration;
use crate::intent::{self, IntentRecord, Recovery};
use crate::registry::Registry;
use crate::signal;
use crate::snapshot::StatusSnapshot;
use crate::state::{StatePersister, StepHistoryEntry, StepStatus, WorkflowState};
use flowctl_atoms::{AtomContext, AtomStatus, ManualInterventionAtom};
use flowctl_core::{Clock, SystemClock};
use flowctl_status::{IntegrityStore, Status, StatusTree, Task};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

const ROOT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const ROOT_LOCK_POLL: Duration = Duration::from_millis(100);
const CLEANUP_BUDGET: Duration = Duration::from_secs(2);

/// What one call to [`Engine::run_to_suspension`] settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No active task and no PENDING leaf anywhere: there's nothing to do.
    Idle,
    /// A step returned `Waiting`; a human needs to act before this can
    /// continue.
    Waiting,
    /// A SIGINT/SIGTERM arrived; the in-flight (or about-to-run) step was
    /// marked `Interrupted` and state was flushed.
    Interrupted,
}

/// An exclusive hold on the document directory, mirroring the daemon's
/// lock-file startup idiom but bounded rather than failing outright on
/// contention, since a second `flowctl` invocation racing the first is an
/// ordinary occurrence (e.g. a resume fired while a prior run is still
/// flushing).
struct RootLock {
    file: File,
    path: PathBuf,
}

impl RootLock {
    fn acquire(data_dir: &Path) -> EngineResult<Self> {
        let path = data_dir.join("engine.lock");
        let deadline = std::time::Instant::now() + ROOT_LOCK_TIMEOUT;
        loop {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(|source| EngineError::Io { path: path.clone(), source })?;
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RootLock { file, path }),
                Err(_) if std::time::Instant::now() < deadline => {
                    thread::sleep(ROOT_LOCK_POLL);
                }
                Err(_) => {
                    return Err(EngineError::config(format!(
                        "another flowctl process holds the lock on {}",
                        path.display()
                    )))
                }
            }
        }
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// One level of the fractal-zoom chain: a status document and the task
/// within it that's currently the focus.
struct ZoomFrame {
    integrity: IntegrityStore,
    tree: StatusTree,
    task_id: String,
}

/// What the boot-time integrity sweep found, captured at hydration time
/// since orphan intent locks are cleared as they're discovered and
/// wouldn't otherwise be observable afterward.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub broken_atoms: Vec<(String, String)>,
    pub cleared_orphans: Vec<(String, u32)>,
}

pub struct Engine<C: Clock = SystemClock> {
    root: PathBuf,
    data_dir: PathBuf,
    config: Config,
    registry: Registry,
    state: StatePersister,
    events: EventLog,
    clock: C,
    doctor_report: DoctorReport,
    /// Attempt counts recovered by the boot-time orphan sweep, keyed by
    /// root task id, for tasks whose lock was cleared before
    /// `determine_attempt` got a chance to run its own narrow recovery.
    /// Consumed (removed) the first time that task is next dispatched.
    recovered_attempts: HashMap<String, u32>,
    _root_lock: RootLock,
}

impl Engine<SystemClock> {
    /// Hydrate against the real clock: discover the root, load config and
    /// registry, run the boot-wide orphan sweep.
    pub fn hydrate(start: &Path) -> EngineResult<Self> {
        Self::hydrate_with_clock(start, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn hydrate_with_clock(start: &Path, clock: C) -> EngineResult<Self> {
        let bootstrap = Config::default();
        let (root, data_dir) = hydration::discover_root(start, &bootstrap.marker_dirs)?;

        let config = Config::load(&data_dir.join("config.json"))?;
        let registry = Registry::load(&data_dir.join("flow.registry.json"))?;
        let broken_atoms: Vec<(String, String)> = registry
            .broken_entries()
            .into_iter()
            .map(|(name, implementation_id)| (name.to_string(), implementation_id.to_string()))
            .collect();
        for (name, implementation_id) in &broken_atoms {
            warn!(name, implementation_id, "registry entry does not resolve to a known atom");
        }

        let root_lock = RootLock::acquire(&data_dir)?;

        let state_dir = data_dir.join("state");
        std::fs::create_dir_all(&state_dir).map_err(|source| EngineError::Io { path: state_dir.clone(), source })?;
        let cleared_orphans = intent::scan_orphans(&state_dir)?;
        for (task_id, next_attempt) in &cleared_orphans {
            warn!(task_id, next_attempt, "cleared orphaned intent lock left by a crashed run");
        }
        let recovered_attempts: HashMap<String, u32> = cleared_orphans.iter().cloned().collect();

        let events = EventLog::new(
            event_log::default_path(&data_dir),
            event_log::default_artifacts_dir(&data_dir),
            config.event_log.rotate_bytes,
            config.event_log.blob_inline_max_bytes,
        );

        Ok(Engine {
            root,
            data_dir,
            config,
            registry,
            state: StatePersister::new(state_dir),
            events,
            clock,
            doctor_report: DoctorReport { broken_atoms, cleared_orphans },
            recovered_attempts,
            _root_lock: root_lock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// What the boot-time sweep found when this engine was hydrated.
    pub fn doctor_report(&self) -> &DoctorReport {
        &self.doctor_report
    }

    /// Read-only flattened view of the status document, for the `status`
    /// CLI subcommand. Never opens the process lock for writing.
    pub fn status_snapshot(&self) -> EngineResult<StatusSnapshot> {
        let (_, tree) = self.load_tree(&self.status_path())?;
        Ok(StatusSnapshot::build(&tree))
    }

    /// Pure integrity check: re-parses and re-validates the status document
    /// without mutating anything.
    pub fn validate(&self) -> EngineResult<()> {
        let (_, tree) = self.load_tree(&self.status_path())?;
        tree.validate(&self.data_dir)?;
        Ok(())
    }

    /// Revert a task and every one of its descendants to PENDING. Defaults
    /// to the currently active task when `task_id` is omitted. The backup
    /// rotation this triggers comes from `IntegrityStore::save` itself.
    pub fn reset_task(&mut self, task_id: Option<&str>) -> EngineResult<()> {
        let (mut integrity, mut tree) = self.load_tree(&self.status_path())?;
        let target = match task_id {
            Some(id) => id.to_string(),
            None => tree
                .get_active_task()
                .map(|(id, _)| id)
                .ok_or_else(|| EngineError::contract("no active task to reset; pass a task id explicitly"))?,
        };
        let descendants = collect_descendant_ids(&mut tree, &target)?;
        tree.update_task(&target, None, Some(Status::Pending), None)?;
        for descendant in descendants {
            tree.update_task(&descendant, None, Some(Status::Pending), None)?;
        }
        let bytes = tree.serialize()?;
        integrity.save(&bytes)?;
        Ok(())
    }

    /// Move a DONE task back to ACTIVE. Any DONE ancestor between the root
    /// and the target is reopened too, since an ACTIVE task with a DONE
    /// parent would fail the same invariant a reset has to respect.
    pub fn reopen_task(&mut self, task_id: &str) -> EngineResult<()> {
        let (mut integrity, mut tree) = self.load_tree(&self.status_path())?;
        reopen_path(&mut tree, task_id)?;
        let bytes = tree.serialize()?;
        integrity.save(&bytes)?;
        Ok(())
    }

    /// `start [task_id]`: when an explicit id is given, activate that task
    /// (and its PENDING ancestors) in the root status document before the
    /// caller runs to suspension, so an explicit start always wins over
    /// whichever PENDING leaf `get_active_task`'s fallback would otherwise
    /// have picked. With no id this is a no-op: `run_to_suspension` already
    /// activates the fallback leaf itself.
    pub fn start_task(&mut self, task_id: Option<&str>) -> EngineResult<()> {
        let Some(task_id) = task_id else {
            return Ok(());
        };
        let (mut integrity, mut tree) = self.load_tree(&self.status_path())?;
        if activate_path(&mut tree, task_id)? {
            let bytes = tree.serialize()?;
            integrity.save(&bytes)?;
        }
        Ok(())
    }

    fn status_path(&self) -> PathBuf {
        self.data_dir.join(&self.config.status_file)
    }

    fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    fn load_tree(&self, path: &Path) -> EngineResult<(IntegrityStore, StatusTree)> {
        let integrity = IntegrityStore::new(path).with_keep(self.config.backups.keep);
        let bytes = integrity.load()?;
        let tree = StatusTree::load(&bytes, &self.data_dir)?;
        Ok((integrity, tree))
    }

    /// Drill from the root status document down through `ref`-linked
    /// sub-documents to the leaf task that should actually be dispatched,
    /// per the fractal-zoom design: `get_active_task` only resolves within
    /// one document, so the Engine itself walks the `ref` chain.
    fn zoom_to_leaf(&self) -> EngineResult<Option<Vec<ZoomFrame>>> {
        let (mut integrity, mut tree) = self.load_tree(&self.status_path())?;
        let mut chain = Vec::new();

        loop {
            let Some((task_id, task)) = tree.get_active_task() else {
                return Ok(if chain.is_empty() { None } else { Some(chain) });
            };
            let ref_path = task.ref_path.clone();

            match ref_path {
                None => {
                    chain.push(ZoomFrame { integrity, tree, task_id });
                    return Ok(Some(chain));
                }
                Some(ref_path) => {
                    if chain.len() + 1 >= self.config.recursion_cap as usize {
                        return Err(EngineError::contract(format!(
                            "workflow composition depth exceeded {} levels",
                            self.config.recursion_cap
                        )));
                    }
                    let sub_path = flowctl_safepath::resolve(&self.data_dir, &ref_path)?;
                    chain.push(ZoomFrame { integrity, tree, task_id });
                    let (next_integrity, next_tree) = self.load_tree(&sub_path)?;
                    integrity = next_integrity;
                    tree = next_tree;
                }
            }
        }
    }

    /// Dotted id under which this chain's state file is keyed: the root
    /// task id, then every nested frame's task id joined with `.`.
    fn compound_id(chain: &[ZoomFrame]) -> (String, Option<String>) {
        let task_id = chain[0].task_id.clone();
        if chain.len() == 1 {
            return (task_id, None);
        }
        let sub_id = chain[1..].iter().map(|f| f.task_id.as_str()).collect::<Vec<_>>().join(".");
        (task_id, Some(sub_id))
    }

    /// The attempt number for the step about to run. Checks, in order: (1)
    /// a count carried forward from the boot-time orphan sweep, since that
    /// sweep clears this task's lock before this method ever sees it; (2) a
    /// lock left directly by this task, for the case where it crashed but
    /// was never caught by the broad sweep (e.g. a lock written after
    /// hydration); (3) the step history, for a task that has never left a
    /// dangling lock at all.
    fn determine_attempt(&mut self, state: &WorkflowState, step_id: &str) -> EngineResult<u32> {
        if let Some(next_attempt) = self.recovered_attempts.remove(&state.task_id) {
            return Ok(next_attempt);
        }
        match intent::recover(&self.state_dir(), &state.task_id)? {
            Recovery::Recovered { next_attempt } => return Ok(next_attempt),
            Recovery::Clean => {}
        }
        Ok(state
            .steps_history
            .iter()
            .rev()
            .find(|entry| entry.step_id == step_id)
            .map(|entry| entry.retry_count + 1)
            .unwrap_or(1))
    }

    /// Run steps until a genuine suspension point: nothing left to do, a
    /// human gate, or a signal. Each iteration drives exactly one task
    /// through fetch -> circuit breaker -> dispatch -> post-step.
    pub fn run_to_suspension(&mut self) -> EngineResult<RunOutcome> {
        loop {
            if signal::interrupted() {
                return Ok(RunOutcome::Interrupted);
            }
            match self.execute_next_step()? {
                StepOutcome::Continue => continue,
                StepOutcome::Idle => return Ok(RunOutcome::Idle),
                StepOutcome::Waiting => return Ok(RunOutcome::Waiting),
                StepOutcome::Interrupted => return Ok(RunOutcome::Interrupted),
            }
        }
    }

    fn execute_next_step(&mut self) -> EngineResult<StepOutcome> {
        let Some(mut chain) = self.zoom_to_leaf()? else {
            return Ok(StepOutcome::Idle);
        };
        self.activate_chain(&mut chain)?;
        let step_id = chain.last().expect("zoom_to_leaf never returns an empty chain").task_id.clone();
        let leaf_name = chain.last_mut().expect("checked above").tree.find(&step_id)?.name.clone();

        let (task_id, sub_id) = Self::compound_id(&chain);
        let mut state = self.state.load(&task_id, sub_id.as_deref()).unwrap_or_else(|| WorkflowState::new(&task_id));

        let attempt_n = self.determine_attempt(&state, &step_id)?;
        let record = IntentRecord {
            task_id: task_id.clone(),
            step_id: step_id.clone(),
            attempt_n,
            pid: std::process::id(),
            started_at_ms: self.clock.epoch_ms(),
        };
        intent::write(&self.state_dir(), &record)?;

        if attempt_n > self.config.retry_bound {
            state.steps_history.push(StepHistoryEntry {
                step_id: step_id.clone(),
                status: StepStatus::Fatal,
                started_at_ms: record.started_at_ms,
                finished_at_ms: Some(self.clock.epoch_ms()),
                retry_count: attempt_n,
                export_digest: None,
            });
            intent::delete(&self.state_dir(), &task_id)?;
            self.state.save(&state, sub_id.as_deref())?;
            return Err(EngineError::FatalRetryExceeded { task_id, step_id, attempts: attempt_n });
        }

        let target = dispatcher::dispatch(&leaf_name, &self.registry);
        let atom: Arc<dyn flowctl_atoms::Atom> = match target {
            DispatchTarget::Flow => {
                return Err(EngineError::contract(format!(
                    "task {step_id:?} carries a flow marker but no ref; nothing to zoom into"
                )));
            }
            DispatchTarget::Atom(name) => self.registry.resolve(&name)?,
            DispatchTarget::ManualIntervention => Arc::new(ManualInterventionAtom::new("manual intervention required")),
        };

        let context_map: serde_json::Map<String, serde_json::Value> = state.context_cache.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let ctx = AtomContext { task_id: &task_id, step_id: &step_id, context: &context_map };

        let result = atom.call(&ctx);

        if signal::interrupted() {
            self.record_interrupted(&mut state, &task_id, &step_id, attempt_n, record.started_at_ms)?;
            run_cleanup_with_budget(atom.as_ref(), &ctx);
            intent::delete(&self.state_dir(), &task_id)?;
            self.state.save(&state, sub_id.as_deref())?;
            return Ok(StepOutcome::Interrupted);
        }

        intent::delete(&self.state_dir(), &task_id)?;

        for (key, value) in &result.exports {
            if key.starts_with("config.") || key.starts_with("system.") {
                warn!(key, "atom attempted to overwrite an engine-owned export key; discarded");
                continue;
            }
            state.context_cache.insert(key.clone(), value.clone());
        }

        if serde_json::to_vec(&state.context_cache).is_err() {
            state.steps_history.push(StepHistoryEntry {
                step_id: step_id.clone(),
                status: StepStatus::Error,
                started_at_ms: record.started_at_ms,
                finished_at_ms: Some(self.clock.epoch_ms()),
                retry_count: attempt_n,
                export_digest: None,
            });
            self.state.save(&state, sub_id.as_deref())?;
            return Err(EngineError::contract("step exports are not serializable"));
        }

        for log_event in &result.events {
            self.events.append(&LogEvent {
                ts_ms: self.clock.epoch_ms(),
                task_id: task_id.clone(),
                step_id: step_id.clone(),
                kind: log_event.kind.clone(),
                payload: log_event.payload.clone(),
                preserve: false,
            })?;
        }

        let export_digest = export_digest(&state.context_cache);
        let finished_at_ms = Some(self.clock.epoch_ms());
        let outcome = match result.status {
            AtomStatus::Success => {
                state.steps_history.push(StepHistoryEntry {
                    step_id: step_id.clone(),
                    status: StepStatus::Completed,
                    started_at_ms: record.started_at_ms,
                    finished_at_ms,
                    retry_count: attempt_n,
                    export_digest,
                });
                self.advance_cursor(&mut chain)?;
                self.state.save(&state, sub_id.as_deref())?;
                StepOutcome::Continue
            }
            AtomStatus::Waiting => {
                state.steps_history.push(StepHistoryEntry {
                    step_id: step_id.clone(),
                    status: StepStatus::Waiting,
                    started_at_ms: record.started_at_ms,
                    finished_at_ms,
                    retry_count: attempt_n,
                    export_digest,
                });
                self.state.save(&state, sub_id.as_deref())?;
                StepOutcome::Waiting
            }
            AtomStatus::Failure | AtomStatus::Error => {
                state.steps_history.push(StepHistoryEntry {
                    step_id: step_id.clone(),
                    status: StepStatus::Error,
                    started_at_ms: record.started_at_ms,
                    finished_at_ms,
                    retry_count: attempt_n,
                    export_digest,
                });
                self.state.save(&state, sub_id.as_deref())?;
                StepOutcome::Continue
            }
        };

        Ok(outcome)
    }

    fn record_interrupted(
        &self,
        state: &mut WorkflowState,
        _task_id: &str,
        step_id: &str,
        attempt_n: u32,
        started_at_ms: u64,
    ) -> EngineResult<()> {
        state.steps_history.push(StepHistoryEntry {
            step_id: step_id.to_string(),
            status: StepStatus::Interrupted,
            started_at_ms,
            finished_at_ms: Some(self.clock.epoch_ms()),
            retry_count: attempt_n,
            export_digest: None,
        });
        Ok(())
    }

    /// Mark the just-completed leaf `Done` via a StatusTree mutation, save
    /// every frame in the zoom chain back through its own IntegrityStore
    /// (innermost first, so a crash mid-save never leaves an outer document
    /// pointing at an inner one that failed to persist).
    fn advance_cursor(&self, chain: &mut [ZoomFrame]) -> EngineResult<()> {
        for frame in chain.iter_mut().rev() {
            frame.tree.update_task(&frame.task_id, None, Some(Status::Done), None)?;
            let bytes = frame.tree.serialize()?;
            frame.integrity.save(&bytes)?;
        }
        Ok(())
    }

    /// `get_active_task` picks the first PENDING leaf when nothing is ACTIVE
    /// yet, but never flips its marker; a fresh task would otherwise be
    /// dispatched while its own document still calls it PENDING. Promote
    /// every frame's task (and, transitively, the ancestors within that same
    /// document) to ACTIVE before the step actually runs, and flush
    /// immediately so a crash between here and post-step still leaves the
    /// document saying what's in flight.
    fn activate_chain(&self, chain: &mut [ZoomFrame]) -> EngineResult<()> {
        let mut changed = false;
        for frame in chain.iter_mut() {
            if activate_path(&mut frame.tree, &frame.task_id)? {
                changed = true;
            }
        }
        if changed {
            for frame in chain.iter_mut().rev() {
                let bytes = frame.tree.serialize()?;
                frame.integrity.save(&bytes)?;
            }
        }
        Ok(())
    }
}

/// Walk a dotted task id from its root segment down to the leaf, activating
/// every PENDING ancestor along the way. Must run top-down: `update_task`
/// refuses to activate a task whose parent isn't ACTIVE yet.
fn activate_path(tree: &mut StatusTree, id: &str) -> EngineResult<bool> {
    let mut changed = false;
    let mut prefix = String::new();
    for segment in id.split('.') {
        prefix = if prefix.is_empty() { segment.to_string() } else { format!("{prefix}.{segment}") };
        if tree.find(&prefix)?.status == Status::Pending {
            tree.update_task(&prefix, None, Some(Status::Active), None)?;
            changed = true;
        }
    }
    Ok(changed)
}

/// Same top-down walk as [`activate_path`], but for `reopen`: any ancestor
/// not already ACTIVE is reopened too (covers DONE, not just PENDING).
fn reopen_path(tree: &mut StatusTree, id: &str) -> EngineResult<()> {
    let mut prefix = String::new();
    for segment in id.split('.') {
        prefix = if prefix.is_empty() { segment.to_string() } else { format!("{prefix}.{segment}") };
        if tree.find(&prefix)?.status != Status::Active {
            tree.update_task(&prefix, None, Some(Status::Active), None)?;
        }
    }
    Ok(())
}

fn collect_descendant_ids(tree: &mut StatusTree, id: &str) -> EngineResult<Vec<String>> {
    let task = tree.find(id)?;
    let mut ids = Vec::new();
    collect_ids(&task.children, id, &mut ids);
    Ok(ids)
}

fn collect_ids(children: &[Task], prefix: &str, out: &mut Vec<String>) {
    for (i, child) in children.iter().enumerate() {
        let id = format!("{prefix}.{}", i + 1);
        out.push(id.clone());
        collect_ids(&child.children, &id, out);
    }
}

enum StepOutcome {
    Continue,
    Idle,
    Waiting,
    Interrupted,
}

fn export_digest(context_cache: &std::collections::BTreeMap<String, serde_json::Value>) -> Option<String> {
    use sha2::{Digest, Sha256};
    let bytes = serde_json::to_vec(context_cache).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

/// Run an atom's `cleanup()` on a background thread under a short time
/// budget, mirroring the dispatcher's regex-timeout guard. `cleanup` is
/// best-effort on the interrupted path; a slow or hung cleanup must never
/// block process exit.
fn run_cleanup_with_budget(atom: &(dyn flowctl_atoms::Atom), ctx: &AtomContext<'_>) {
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        scope.spawn(|| {
            atom.cleanup(ctx);
            let _ = tx.send(());
        });
        let _ = rx.recv_timeout(CLEANUP_BUDGET);
    });
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
