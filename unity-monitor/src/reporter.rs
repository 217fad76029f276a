// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of the final test report.
//!
//! The renderer is a pure function of [`Stats`] and [`Styles`]: it produces a string and leaves
//! writing it out to the caller.

use crate::stats::Stats;
use owo_colors::{OwoColorize, Style};
use swrite::{SWrite, swrite, swriteln};

/// The text rendered when no test results were seen.
pub const NO_RESULTS: &str = "No test results captured";

const RULE_WIDTH: usize = 70;

/// Colors used for the report.
///
/// The default value has no colors. Call [`colorize`](Self::colorize) to enable them.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    is_colorized: bool,
    title: Style,
    count: Style,
    pass: Style,
    fail: Style,
    heading: Style,
}

impl Styles {
    /// Enables colors.
    pub fn colorize(&mut self) {
        self.is_colorized = true;
        self.title = Style::new().magenta().bold();
        self.count = Style::new().blue();
        self.pass = Style::new().green();
        self.fail = Style::new().red();
        self.heading = Style::new().cyan().bold();
    }

    /// Returns true if colors are enabled.
    pub fn is_colorized(&self) -> bool {
        self.is_colorized
    }
}

/// Renders the final report for a run.
///
/// If no tests ran, this is exactly [`NO_RESULTS`]. Otherwise the report contains the overall
/// counts, a verdict banner, one line per captured test record, and a detailed section for every
/// captured failure.
pub fn render_summary(stats: &Stats, styles: &Styles) -> String {
    if stats.tests_run == 0 {
        return NO_RESULTS.to_owned();
    }

    let heavy_rule = "=".repeat(RULE_WIDTH);
    let light_rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    swriteln!(out, "{heavy_rule}");
    swriteln!(out, "{}", "UNITY TEST RESULTS SUMMARY".style(styles.title));
    swriteln!(out, "{heavy_rule}");

    swriteln!(out, "{} {}", "Tests Run:".style(styles.count), stats.tests_run.style(styles.count));
    swriteln!(out, "{} {}", "Passed:".style(styles.pass), stats.tests_passed.style(styles.pass));
    swriteln!(out, "{} {}", "Failed:".style(styles.fail), stats.tests_failed.style(styles.fail));

    if stats.tests_failed == 0 {
        swriteln!(out, "{}", "ALL TESTS PASSED!".style(styles.pass));
    } else {
        swriteln!(
            out,
            "{} {}",
            stats.tests_failed.style(styles.fail),
            "TEST(S) FAILED".style(styles.fail),
        );
    }

    swriteln!(out, "{light_rule}");
    swriteln!(out, "{}", "DETAILED RESULTS:".style(styles.heading));

    for record in &stats.passed_tests {
        swriteln!(out, "{} {}", "✓ PASS:".style(styles.pass), record.test_name);
    }

    for record in &stats.failed_tests {
        swrite!(out, "{} {}", "✗ FAIL:".style(styles.fail), record.test_name);
        if !record.message.is_empty() {
            swrite!(out, " - {}", record.message);
        }
        swriteln!(out, " ({}:{})", record.file, record.line);
    }

    if !stats.failed_tests.is_empty() {
        out.push('\n');
        swriteln!(out, "{light_rule}");
        swriteln!(out, "{}", "FAILURE DETAILS:".style(styles.heading));
        for (i, record) in stats.failed_tests.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            swriteln!(
                out,
                "{} {}",
                format!("{}.", i + 1).style(styles.fail),
                record.test_name.style(styles.fail),
            );
            swriteln!(out, "   File: {}:{}", record.file, record.line);
            if !record.message.is_empty() {
                swriteln!(out, "   Error: {}", record.message);
            }
        }
    }

    swrite!(out, "{heavy_rule}");
    out
}
