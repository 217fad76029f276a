// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [esp-ram-test](https://crates.io/crates/esp-ram-test): a streaming
//! monitor for [Unity](https://www.throwtheswitch.org/unity) test output.
//!
//! The basic flow of operations is:
//!
//! 1. A [`ByteSource`](source::ByteSource) yields whatever bytes the target has written so far.
//! 2. The [`LineAssembler`](assembler::LineAssembler) turns those chunks into complete lines.
//! 3. Each line is classified into a [`LineEvent`](classify::LineEvent).
//! 4. Events update the [`Stats`](stats::Stats) and the
//!    [`CompletionDetector`](completion::CompletionDetector).
//! 5. Once the run completes or the deadline passes, the
//!    [`MonitorLoop`](monitor::MonitorLoop) produces a
//!    [`MonitorOutcome`](monitor::MonitorOutcome) which the
//!    [`reporter`] renders for humans.

pub mod assembler;
pub mod classify;
pub mod completion;
pub mod config;
pub mod errors;
pub mod exit_codes;
pub mod loader;
pub mod monitor;
pub mod reporter;
pub mod signal;
pub mod source;
pub mod stats;
