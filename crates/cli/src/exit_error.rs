// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code table: 0 success; 1 user/config error; 2 integrity/validation
/// failure; 3 tamper detected; 130 SIGINT.
impl From<flowctl_engine::EngineError> for ExitError {
    fn from(err: flowctl_engine::EngineError) -> Self {
        use flowctl_engine::EngineError as E;
        let code = match &err {
            E::RootNotFound(_) | E::Config(_) | E::UnknownAtom(_) | E::TaskOwnedElsewhere(_) | E::FatalRetryExceeded { .. } => 1,
            E::ContractViolation(_) => 2,
            E::Io { .. } | E::Json { .. } => 1,
            E::Status(status_err) => status_exit_code(status_err),
            E::Loom(loom_err) => loom_exit_code(loom_err),
            E::SafePath(safepath_err) => safepath_exit_code(safepath_err),
        };
        ExitError::new(code, err.to_string())
    }
}

fn status_exit_code(err: &flowctl_status::StatusError) -> i32 {
    use flowctl_status::StatusError as E;
    match err {
        E::Security(_) | E::Integrity { .. } => 3,
        E::SafePath(inner) => safepath_exit_code(inner),
        E::Validation(_) | E::State(_) | E::Anchor { .. } | E::Id(_) | E::StaleId(_) => 2,
        E::Io { .. } => 1,
    }
}

fn loom_exit_code(err: &flowctl_loom::LoomError) -> i32 {
    use flowctl_loom::LoomError as E;
    match err {
        E::PermissionDenied(_) | E::Security(_) => 3,
        E::SafePath(inner) => safepath_exit_code(inner),
        E::Uniqueness { .. } | E::ContentChanged(_) | E::Encoding(_) | E::TooLarge { .. } => 2,
        E::ResourceBusy(_) | E::Io { .. } => 1,
    }
}

fn safepath_exit_code(err: &flowctl_safepath::SafePathError) -> i32 {
    use flowctl_safepath::SafePathError as E;
    match err {
        E::Io { .. } => 1,
        E::NullByte | E::PathTooLong(_) | E::RootNotFound(_) | E::InvalidRoot(_) | E::Security(_) => 3,
    }
}
