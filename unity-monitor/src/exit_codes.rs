// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Documented exit codes for `esp-ram-test`.

/// Documented exit codes for `esp-ram-test`.
///
/// CI systems only distinguish "the firmware's tests passed" from everything else, so there are
/// just two codes. Timeouts, test failures, runs that completed without reporting any tests,
/// interrupts and setup errors all exit with [`FAILED`](Self::FAILED).
pub enum RamTestExitCode {}

impl RamTestExitCode {
    /// The run completed, at least one test ran, and no tests failed.
    pub const OK: i32 = 0;

    /// Anything else.
    pub const FAILED: i32 = 1;

    /// Returns the exit code for a run-level success value.
    pub fn from_success(success: bool) -> i32 {
        if success { Self::OK } else { Self::FAILED }
    }
}
