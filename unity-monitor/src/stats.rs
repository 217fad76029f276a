// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregated pass/fail statistics for a monitored test run.

use crate::classify::LineEvent;
use std::fmt;

/// The verdict carried by a single test result line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TestStatus {
    /// The line contained `:PASS`.
    Pass,
    /// The line contained `:FAIL`.
    Fail,
}

impl TestStatus {
    /// Returns the status as it appears in Unity output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed test result, e.g. `test/test_math.c:12:test_sub:FAIL:expected 5 got 4`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestResultRecord {
    /// The name of the test function.
    pub test_name: String,

    /// The file name, without any leading directories.
    pub file: String,

    /// The line number, passed through as written.
    pub line: String,

    /// Whether the test passed or failed.
    pub status: TestStatus,

    /// The failure message, or an empty string.
    pub message: String,
}

/// Statistics for a monitored test run.
///
/// While counts are only built up from individual result lines,
/// `tests_run == tests_passed + tests_failed` holds. A Unity summary line replaces the counts
/// wholesale but leaves `passed_tests` and `failed_tests` alone, so afterwards the list lengths
/// may disagree with the counts. That is the expected behavior: the summary is the authoritative
/// tally, and the lists only hold what was actually seen on the wire.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// The number of tests that ran.
    pub tests_run: usize,

    /// The number of tests that passed.
    pub tests_passed: usize,

    /// The number of tests that failed.
    pub tests_failed: usize,

    /// Parsed records for passing tests, in capture order.
    pub passed_tests: Vec<TestResultRecord>,

    /// Parsed records for failing tests, in capture order.
    pub failed_tests: Vec<TestResultRecord>,
}

impl Stats {
    /// Returns true if at least one test ran and none of them failed.
    ///
    /// A run where no tests were observed is never a success, even if the target reported that it
    /// completed.
    pub fn is_success(&self) -> bool {
        self.tests_run > 0 && self.tests_failed == 0
    }
}

/// Owns the [`Stats`] for a run and updates them from classified lines.
#[derive(Clone, Debug, Default)]
pub struct StatsAggregator {
    stats: Stats,
}

impl StatsAggregator {
    /// Creates an aggregator with all counts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a classified line to the statistics.
    ///
    /// Events that don't carry test results are ignored.
    pub fn apply(&mut self, event: &LineEvent) {
        match event {
            LineEvent::TestResult { status, record } => {
                self.on_test_result(*status, record.as_ref());
            }
            LineEvent::Summary { run, failed } => self.on_summary(*run, *failed),
            LineEvent::MalformedSummary
            | LineEvent::TerminalMarker(_)
            | LineEvent::FallbackMarker { .. }
            | LineEvent::Unclassified => {}
        }
    }

    /// Returns the statistics gathered so far.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Consumes the aggregator, returning the final statistics.
    pub fn into_stats(self) -> Stats {
        self.stats
    }

    fn on_test_result(&mut self, status: TestStatus, record: Option<&TestResultRecord>) {
        self.stats.tests_run += 1;
        let list = match status {
            TestStatus::Pass => {
                self.stats.tests_passed += 1;
                &mut self.stats.passed_tests
            }
            TestStatus::Fail => {
                self.stats.tests_failed += 1;
                &mut self.stats.failed_tests
            }
        };
        // Lines that mention PASS/FAIL but don't have enough fields are still counted.
        if let Some(record) = record {
            list.push(record.clone());
        }
    }

    fn on_summary(&mut self, run: usize, failed: usize) {
        self.stats.tests_run = run;
        self.stats.tests_failed = failed;
        self.stats.tests_passed = run.saturating_sub(failed);
    }
}
