// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{collections::VecDeque, io, time::Duration};
use unity_monitor::{config::MonitorSettings, source::ByteSource};

pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn settings() -> MonitorSettings {
    MonitorSettings {
        timeout: TIMEOUT,
        poll_interval: Duration::from_millis(10),
        grace_period: Duration::from_millis(500),
    }
}

/// What a single read from a [`ScriptedSource`] returns.
#[derive(Debug)]
pub(crate) enum Step {
    Data(Vec<u8>),
    Idle,
    Error(io::ErrorKind),
}

impl Step {
    pub(crate) fn data(bytes: impl AsRef<[u8]>) -> Self {
        Self::Data(bytes.as_ref().to_vec())
    }
}

/// An in-memory source that plays back a fixed sequence of reads, then reports no data forever.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    steps: VecDeque<Step>,
    reads: usize,
}

impl ScriptedSource {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            reads: 0,
        }
    }

    /// One read per line, each line terminated with `\n`.
    pub(crate) fn lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|line| Step::data(format!("{line}\n"))))
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads
    }

    pub(crate) fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ByteSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted source"
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(Step::Data(bytes)) => {
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Step::Idle) | None => Ok(0),
            Some(Step::Error(kind)) => Err(io::Error::new(kind, "scripted failure")),
        }
    }
}

/// A writer that always fails.
#[derive(Debug)]
pub(crate) struct BrokenPipe;

impl io::Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
