// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn fixture_record(pid: u32) -> IntentRecord {
    IntentRecord { task_id: "t1".to_string(), step_id: "s1".to_string(), attempt_n: 1, pid, started_at_ms: 1_000 }
}

#[test]
fn no_lock_file_is_clean() {
    let dir = tempdir().unwrap();
    let recovery = recover(dir.path(), "t1").unwrap();
    assert!(matches!(recovery, Recovery::Clean));
}

#[test]
fn dead_pid_lock_is_recovered_and_deleted() {
    let dir = tempdir().unwrap();
    // pid 0 is never a real process we'd find alive via sysinfo's lookup by id.
    write(dir.path(), &fixture_record(0)).unwrap();

    let recovery = recover(dir.path(), "t1").unwrap();

    match recovery {
        Recovery::Recovered { next_attempt } => assert_eq!(next_attempt, 2),
        Recovery::Clean => panic!("expected a recovered lock"),
    }
    assert!(!lock_path(dir.path(), "t1").exists());
}

#[test]
fn live_pid_lock_refuses_to_proceed() {
    let dir = tempdir().unwrap();
    let own_pid = std::process::id();
    write(dir.path(), &fixture_record(own_pid)).unwrap();

    let err = recover(dir.path(), "t1").unwrap_err();

    assert!(matches!(err, EngineError::TaskOwnedElsewhere(pid) if pid == own_pid));
    assert!(lock_path(dir.path(), "t1").exists());
}

#[test]
fn write_then_delete_round_trips() {
    let dir = tempdir().unwrap();
    write(dir.path(), &fixture_record(0)).unwrap();
    assert!(lock_path(dir.path(), "t1").exists());

    delete(dir.path(), "t1").unwrap();

    assert!(!lock_path(dir.path(), "t1").exists());
}

#[test]
fn delete_on_absent_lock_is_a_no_op() {
    let dir = tempdir().unwrap();
    delete(dir.path(), "missing").unwrap();
}

#[test]
fn scan_orphans_clears_dead_locks_and_leaves_live_ones() {
    let dir = tempdir().unwrap();
    write(dir.path(), &fixture_record(0)).unwrap();
    let mut live = fixture_record(std::process::id());
    live.task_id = "t2".to_string();
    write(dir.path(), &live).unwrap();

    let cleared = scan_orphans(dir.path()).unwrap();

    assert_eq!(cleared, vec![("t1".to_string(), 2)]);
    assert!(!lock_path(dir.path(), "t1").exists());
    assert!(lock_path(dir.path(), "t2").exists());
}

#[test]
fn scan_orphans_carries_forward_the_recovered_attempt_count() {
    let dir = tempdir().unwrap();
    let mut record = fixture_record(0);
    record.attempt_n = 3;
    write(dir.path(), &record).unwrap();

    let cleared = scan_orphans(dir.path()).unwrap();

    assert_eq!(cleared, vec![("t1".to_string(), 4)]);
}
