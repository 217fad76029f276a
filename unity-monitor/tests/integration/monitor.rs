// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use std::{io, time::Duration};
use unity_monitor::{
    classify::{CompletionTrigger, TerminalMarker},
    completion::MonitorState,
    monitor::{MonitorInterrupt, MonitorLoop, MonitorOutcome},
    reporter::{NO_RESULTS, Styles, render_summary},
    signal::SignalHandlerKind,
    stats::{TestResultRecord, TestStatus},
};

async fn run(source: &mut ScriptedSource) -> (MonitorOutcome, Vec<u8>) {
    let mut echo = Vec::new();
    let outcome = MonitorLoop::new(settings(), SignalHandlerKind::Noop)
        .run(&mut *source, &mut echo)
        .await
        .expect("noop signal handler always builds");
    (outcome, echo)
}

fn record(test_name: &str, line: &str, status: TestStatus, message: &str) -> TestResultRecord {
    TestResultRecord {
        test_name: test_name.to_owned(),
        file: "test.c".to_owned(),
        line: line.to_owned(),
        status,
        message: message.to_owned(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_mixed_results() {
    let mut source = ScriptedSource::lines(&[
        "test.c:10:test_add:PASS",
        "test.c:12:test_sub:FAIL:expected 5 got 4",
        "2 Tests 1 Failures 0 Ignored",
    ]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::Completed);
    assert_eq!(outcome.trigger, Some(CompletionTrigger::Summary));
    assert!(outcome.interrupt.is_none());
    assert_eq!(outcome.stats.tests_run, 2);
    assert_eq!(outcome.stats.tests_passed, 1);
    assert_eq!(outcome.stats.tests_failed, 1);
    assert_eq!(
        outcome.stats.passed_tests,
        [record("test_add", "10", TestStatus::Pass, "")]
    );
    assert_eq!(
        outcome.stats.failed_tests,
        [record("test_sub", "12", TestStatus::Fail, "expected 5 got 4")]
    );
    assert!(outcome.is_completed());
    assert!(!outcome.is_success());
    assert!(
        outcome.elapsed >= settings().grace_period,
        "completion waits out the grace period"
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_marker_only() {
    let mut source = ScriptedSource::lines(&["OK"]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::Completed);
    assert_eq!(
        outcome.trigger,
        Some(CompletionTrigger::TerminalMarker(TerminalMarker::Ok))
    );
    assert_eq!(outcome.stats.tests_run, 0);
    assert_eq!(render_summary(&outcome.stats, &Styles::default()), NO_RESULTS);
    assert!(outcome.is_completed());
    assert!(!outcome.is_success(), "no tests ran");
}

#[tokio::test(start_paused = true)]
async fn test_silence_times_out() {
    let mut source = ScriptedSource::default();
    let (outcome, echo) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert_eq!(outcome.trigger, None);
    assert!(outcome.interrupt.is_none());
    assert!(!outcome.is_completed());
    assert!(!outcome.is_success());
    assert!(echo.is_empty());
    assert!(
        outcome.elapsed >= TIMEOUT && outcome.elapsed < TIMEOUT + Duration::from_millis(100),
        "elapsed: {:?}",
        outcome.elapsed
    );
    // The loop kept polling at the poll interval until the deadline.
    assert!(source.reads() >= 400, "reads: {}", source.reads());
}

#[tokio::test(start_paused = true)]
async fn test_unterminated_line_is_flushed_on_timeout() {
    let mut source = ScriptedSource::new([Step::data("test.c:3:test_tail:PASS")]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert_eq!(outcome.stats.tests_run, 1);
    assert_eq!(
        outcome.stats.passed_tests,
        [record("test_tail", "3", TestStatus::Pass, "")]
    );
    assert!(!outcome.is_success(), "a timed out run never succeeds");
}

#[tokio::test(start_paused = true)]
async fn test_grace_drain_captures_trailing_output() {
    let mut source = ScriptedSource::new([
        Step::data("test.c:1:test_a:PASS\nOK\n"),
        Step::data("test.c:2:test_b:FA"),
        Step::data("IL:late"),
        Step::Idle,
        Step::data("never read\n"),
    ]);
    let (outcome, echo) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::Completed);
    assert_eq!(source.remaining(), 1, "the drain stops at the first empty read");
    assert_eq!(outcome.stats.tests_run, 2);
    assert_eq!(
        outcome.stats.failed_tests,
        [record("test_b", "2", TestStatus::Fail, "late")]
    );
    assert_eq!(
        echo,
        b"test.c:1:test_a:PASS\nOK\ntest.c:2:test_b:FAIL:late".as_slice()
    );
}

#[tokio::test(start_paused = true)]
async fn test_lines_after_trigger_in_same_chunk_are_counted() {
    let mut source = ScriptedSource::new([Step::data("OK\ntest.c:2:test_b:FAIL\n")]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(
        outcome.trigger,
        Some(CompletionTrigger::TerminalMarker(TerminalMarker::Ok))
    );
    assert_eq!(outcome.stats.tests_run, 1);
    assert_eq!(outcome.stats.tests_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lines_split_across_idle_reads() {
    let mut source = ScriptedSource::new([
        Step::data("test.c:7:te"),
        Step::Idle,
        Step::data("st_split:PA"),
        Step::Idle,
        Step::Idle,
        Step::data("SS\n1 Tests 0 Failures 0 Ignored\n"),
    ]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::Completed);
    assert_eq!(
        outcome.stats.passed_tests,
        [record("test_split", "7", TestStatus::Pass, "")]
    );
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_summary_overrides_counts_but_not_records() {
    let mut source = ScriptedSource::lines(&[
        "test.c:1:test_a:PASS",
        "5 Tests 1 Failures 0 Ignored",
    ]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.stats.tests_run, 5);
    assert_eq!(outcome.stats.tests_passed, 4);
    assert_eq!(outcome.stats.tests_failed, 1);
    assert_eq!(outcome.stats.passed_tests.len(), 1);
    assert!(outcome.stats.failed_tests.is_empty());
    assert!(!outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_raw_bytes_are_echoed() {
    let mut source = ScriptedSource::new([
        Step::data(b"\xfftest.c:1:test_a:PASS\r\n"),
        Step::data("OK\r\n"),
    ]);
    let (outcome, echo) = run(&mut source).await;

    assert_eq!(echo, b"\xfftest.c:1:test_a:PASS\r\nOK\r\n".as_slice());
    assert_eq!(
        outcome.stats.passed_tests,
        [record("test_a", "1", TestStatus::Pass, "")]
    );
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_echo_failure_is_not_fatal() {
    let mut source = ScriptedSource::lines(&["test.c:1:test_a:PASS", "OK"]);
    let outcome = MonitorLoop::new(settings(), SignalHandlerKind::Noop)
        .run(&mut source, BrokenPipe)
        .await
        .unwrap();

    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_read_error_stops_the_loop() {
    let mut source = ScriptedSource::new([
        Step::data("test.c:1:test_a:PASS\npartial"),
        Step::Error(io::ErrorKind::BrokenPipe),
        Step::data("OK\n"),
    ]);
    let (outcome, _) = run(&mut source).await;

    assert_eq!(outcome.state, MonitorState::Running);
    assert_eq!(source.remaining(), 1);
    match &outcome.interrupt {
        Some(MonitorInterrupt::Read(error)) => {
            assert_eq!(error.source_name(), "scripted source");
        }
        other => panic!("unexpected interrupt: {other:?}"),
    }
    // The residual buffer is still flushed and classified.
    assert_eq!(outcome.stats.tests_run, 1);
    assert!(!outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_read_error_during_grace_drain() {
    let mut source = ScriptedSource::new([
        Step::data("test.c:1:test_a:PASS\nOK\n"),
        Step::Error(io::ErrorKind::Other),
    ]);
    let (outcome, _) = run(&mut source).await;

    assert!(outcome.is_completed());
    assert!(matches!(outcome.interrupt, Some(MonitorInterrupt::Read(_))));
    assert!(!outcome.is_success());
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn test_sigint_stops_the_loop() {
    use nix::sys::signal::{Signal, raise};
    use unity_monitor::signal::ShutdownEvent;

    let mut source = ScriptedSource::lines(&["test.c:1:test_a:PASS"]);
    let monitor = MonitorLoop::new(settings(), SignalHandlerKind::Standard);
    let mut echo = Vec::new();
    // The loop installs its listeners on first poll, before the signal is raised.
    let (outcome, ()) = tokio::join!(monitor.run(&mut source, &mut echo), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        raise(Signal::SIGINT).unwrap();
    });
    let outcome = outcome.unwrap();

    assert!(
        matches!(
            outcome.interrupt,
            Some(MonitorInterrupt::Signal(ShutdownEvent::Interrupt))
        ),
        "unexpected interrupt: {:?}",
        outcome.interrupt
    );
    assert_eq!(outcome.state, MonitorState::Running);
    assert_eq!(outcome.trigger, None);
    assert_eq!(outcome.stats.tests_run, 1, "results seen before the signal are kept");
    assert!(!outcome.is_completed());
    assert!(!outcome.is_success());
    assert!(outcome.elapsed < TIMEOUT, "elapsed: {:?}", outcome.elapsed);
}
