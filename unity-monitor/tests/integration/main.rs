// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod monitor;
mod replay;
