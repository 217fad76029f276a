// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::settings;
use camino_tempfile::NamedUtf8TempFile;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};
use test_case::test_case;
use unity_monitor::{
    monitor::{MonitorLoop, MonitorOutcome},
    signal::SignalHandlerKind,
    source::ReplaySource,
    stats::Stats,
};

static CAPTURE: &str = indoc! {"
    ESP-ROM:esp32c3-api1-20210207
    Build:Feb  7 2021
    rst:0x1 (POWERON),boot:0xc (SPI_FAST_FLASH_BOOT)
    test/test_slip.c:21:test_slip_encode:PASS
    test/test_slip.c:35:test_slip_decode:FAIL:Expected 0xC0 Was 0xDB
    test/test_crc.c:12:test_crc16:PASS
    test/test_crc.c:19:test_crc32_empty:PASS

    -----------------------
    4 Tests 1 Failures 0 Ignored
    FAIL
"};

async fn replay(source: ReplaySource) -> MonitorOutcome {
    MonitorLoop::new(settings(), SignalHandlerKind::Noop)
        .run(source, std::io::sink())
        .await
        .expect("noop signal handler always builds")
}

async fn replay_whole_capture() -> Stats {
    let source = ReplaySource::from_reader("capture", Cursor::new(CAPTURE))
        .with_chunk_size(CAPTURE.len());
    replay(source).await.stats
}

#[test_case(1; "single bytes")]
#[test_case(3; "three bytes")]
#[test_case(17; "seventeen bytes")]
#[test_case(64; "default")]
#[tokio::test(start_paused = true)]
async fn test_chunk_size_does_not_change_stats(chunk_size: usize) {
    let expected = replay_whole_capture().await;
    assert_eq!(expected.tests_run, 4);
    assert_eq!(expected.tests_failed, 1);

    let source =
        ReplaySource::from_reader("capture", Cursor::new(CAPTURE)).with_chunk_size(chunk_size);
    let outcome = replay(source).await;
    assert!(outcome.is_completed());
    assert_eq!(outcome.stats, expected);
}

#[tokio::test(start_paused = true)]
async fn test_replay_from_file() {
    let mut file = NamedUtf8TempFile::new().unwrap();
    file.write_all(CAPTURE.as_bytes()).unwrap();

    let outcome = replay(ReplaySource::open(file.path()).unwrap()).await;
    assert!(outcome.is_completed());
    assert!(!outcome.is_success());
    assert_eq!(outcome.stats.passed_tests.len(), 3);
    assert_eq!(outcome.stats.failed_tests[0].test_name, "test_slip_decode");
    assert_eq!(outcome.stats.failed_tests[0].file, "test_slip.c");
    assert_eq!(outcome.stats.failed_tests[0].message, "Expected 0xC0 Was 0xDB");
}

static TRAILING_AFTER_OK: &str = indoc! {"
    OK
    test.c:1:test_1:PASS
    test.c:2:test_2:PASS
    test.c:3:test_3:PASS
    test.c:4:test_4:PASS
    test.c:5:test_5:PASS
    test.c:6:test_6:PASS
    test.c:7:test_7:PASS
    test.c:8:test_8:PASS
    test.c:9:test_9:PASS
    test.c:10:test_10:FAIL:late
"};

#[test_case(1; "single bytes")]
#[test_case(64; "default")]
#[test_case(TRAILING_AFTER_OK.len(); "whole log")]
#[tokio::test(start_paused = true)]
async fn test_output_after_completion_is_drained(chunk_size: usize) {
    let source = ReplaySource::from_reader("trailing", Cursor::new(TRAILING_AFTER_OK))
        .with_chunk_size(chunk_size);
    let outcome = replay(source).await;

    assert!(outcome.is_completed());
    assert_eq!(outcome.stats.tests_run, 10);
    assert_eq!(outcome.stats.passed_tests.len(), 9);
    assert_eq!(outcome.stats.failed_tests[0].test_name, "test_10");
}
