// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SIGINT/SIGTERM trapping. The execution loop is synchronous and only
//! polls [`interrupted`] between steps; a background thread runs a small
//! current-thread tokio runtime whose only job is to await a signal and
//! flip an atomic flag, mirroring the `ShellAtom` async-boundary shim.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALLED: Once = Once::new();

/// Install the background signal-watching thread. Idempotent: a second
/// call is a no-op.
pub fn install() {
    INSTALLED.call_once(|| {
        std::thread::spawn(watch);
    });
}

fn watch() {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
        return;
    };
    runtime.block_on(async {
        let Ok(mut sigterm) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        INTERRUPTED.store(true, Ordering::SeqCst);
    });
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
pub fn reset_for_test() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
pub fn simulate_interrupt_for_test() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
