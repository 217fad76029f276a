// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load a [Unity](https://www.throwtheswitch.org/unity) test binary into the RAM of an Espressif
//! chip, watch its serial output, and report the results.
//!
//! The monitoring itself lives in the [`unity_monitor`] crate. This crate is the command-line
//! front end.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
