// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn starts_out_not_interrupted() {
    reset_for_test();
    assert!(!interrupted());
}

#[test]
#[serial]
fn install_is_idempotent() {
    reset_for_test();
    install();
    install();
    assert!(!interrupted());
}

#[test]
#[serial]
fn flag_can_be_set_and_observed_without_a_real_signal() {
    reset_for_test();
    INTERRUPTED.store(true, Ordering::SeqCst);
    assert!(interrupted());
    reset_for_test();
    assert!(!interrupted());
}
