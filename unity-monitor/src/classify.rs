// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of output lines against Unity's output format.
//!
//! Unity prints one line per test:
//!
//! ```text
//! test/test_math.c:10:test_add:PASS
//! test/test_math.c:12:test_sub:FAIL:Expected 5 Was 4
//! ```
//!
//! followed by a tally and a verdict:
//!
//! ```text
//! 2 Tests 1 Failures 0 Ignored
//! FAIL
//! ```
//!
//! Each line is checked against the rules below, in order. The first rule that matches decides
//! the [`LineEvent`]:
//!
//! 1. a test result: the line contains `:PASS` or `:FAIL`
//! 2. a summary: the line contains `Tests` and either `Failures` or `Ignored`
//! 3. a terminal marker: the line is exactly `OK` or `FAIL`
//! 4. a fallback marker: the line contains one of [`FALLBACK_MARKERS`], ignoring case
//!
//! Anything else is [`LineEvent::Unclassified`].

use crate::stats::{TestResultRecord, TestStatus};
use std::fmt;

/// Phrases that indicate the end of a run for firmware that doesn't end with a Unity summary.
///
/// Matched case-insensitively anywhere in a line.
pub const FALLBACK_MARKERS: &[&str] = &[
    "UNITY TEST RUN COMPLETE",
    "ALL TESTS PASSED",
    "SOME TESTS FAILED",
    "END OF TESTS",
];

/// The classification of a single line of output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineEvent {
    /// The result of a single test.
    TestResult {
        /// Whether `:PASS` or `:FAIL` was seen.
        status: TestStatus,

        /// The parsed record, if the line had at least four `:`-separated fields.
        record: Option<TestResultRecord>,
    },

    /// A Unity summary line such as `5 Tests 1 Failures 0 Ignored`.
    Summary {
        /// The first number in the line.
        run: usize,

        /// The second number in the line.
        failed: usize,
    },

    /// A line that looks like a summary but doesn't contain two numbers.
    MalformedSummary,

    /// A bare `OK` or `FAIL`.
    TerminalMarker(TerminalMarker),

    /// A line containing one of the [`FALLBACK_MARKERS`].
    FallbackMarker {
        /// The marker that matched.
        marker: &'static str,
    },

    /// Any other output.
    Unclassified,
}

impl LineEvent {
    /// Returns the completion trigger corresponding to this event, if any.
    pub fn completion_trigger(&self) -> Option<CompletionTrigger> {
        match self {
            Self::Summary { .. } => Some(CompletionTrigger::Summary),
            Self::TerminalMarker(marker) => Some(CompletionTrigger::TerminalMarker(*marker)),
            Self::FallbackMarker { marker } => Some(CompletionTrigger::FallbackMarker(*marker)),
            Self::TestResult { .. } | Self::MalformedSummary | Self::Unclassified => None,
        }
    }
}

/// A bare verdict line printed by Unity at the end of a run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TerminalMarker {
    /// `OK`: all tests passed.
    Ok,
    /// `FAIL`: at least one test failed.
    Fail,
}

impl TerminalMarker {
    fn from_line(line: &str) -> Option<Self> {
        match line {
            "OK" => Some(Self::Ok),
            "FAIL" => Some(Self::Fail),
            _ => None,
        }
    }

    /// Returns the marker as printed.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
        }
    }
}

/// The reason a run was considered complete.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompletionTrigger {
    /// A Unity summary line was seen.
    Summary,
    /// A bare `OK` or `FAIL` was seen.
    TerminalMarker(TerminalMarker),
    /// One of the [`FALLBACK_MARKERS`] was seen.
    FallbackMarker(&'static str),
}

impl fmt::Display for CompletionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => write!(f, "Unity test summary"),
            Self::TerminalMarker(marker) => {
                write!(f, "Unity terminal marker `{}`", marker.as_str())
            }
            Self::FallbackMarker(marker) => write!(f, "completion marker `{marker}`"),
        }
    }
}

/// Classifies a line of output.
///
/// Surrounding whitespace (including the `\r` of a `\r\n` line ending) is ignored. Blank lines
/// are [`LineEvent::Unclassified`].
pub fn classify_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() {
        return LineEvent::Unclassified;
    }

    // Counting is based on the substring alone. Whether the line parses into a record is a
    // separate question.
    let status = if line.contains(":PASS") {
        Some(TestStatus::Pass)
    } else if line.contains(":FAIL") {
        Some(TestStatus::Fail)
    } else {
        None
    };
    if let Some(status) = status {
        return LineEvent::TestResult {
            status,
            record: parse_test_record(line, status),
        };
    }

    if line.contains("Tests") && (line.contains("Failures") || line.contains("Ignored")) {
        let mut numbers = decimal_numbers(line);
        return match (numbers.next(), numbers.next()) {
            (Some(Some(run)), Some(Some(failed))) => LineEvent::Summary { run, failed },
            _ => LineEvent::MalformedSummary,
        };
    }

    if let Some(marker) = TerminalMarker::from_line(line) {
        return LineEvent::TerminalMarker(marker);
    }

    let upper = line.to_uppercase();
    if let Some(marker) = FALLBACK_MARKERS
        .iter()
        .copied()
        .find(|marker| upper.contains(marker))
    {
        return LineEvent::FallbackMarker { marker };
    }

    LineEvent::Unclassified
}

/// Parses `path/to/file.c:line:name:STATUS[:message]`.
///
/// The message may itself contain colons. Returns `None` if there are fewer than four fields.
fn parse_test_record(line: &str, status: TestStatus) -> Option<TestResultRecord> {
    let fields: Vec<&str> = line.split(':').collect();
    let [path, line_number, test_name, _status, message @ ..] = fields.as_slice() else {
        return None;
    };

    let file = path.rsplit('/').next().unwrap_or(*path);
    Some(TestResultRecord {
        test_name: (*test_name).to_owned(),
        file: file.to_owned(),
        line: (*line_number).to_owned(),
        status,
        message: message.join(":").trim().to_owned(),
    })
}

/// Returns every run of ASCII digits in the line, in order.
///
/// A run too large to fit in a `usize` yields `None`.
fn decimal_numbers(line: &str) -> impl Iterator<Item = Option<usize>> + '_ {
    line.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
}
