// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The monitoring loop.
//!
//! [`MonitorLoop`] polls a [`ByteSource`], echoes everything it reads, and feeds complete lines
//! through classification, aggregation and completion detection until the run completes, the
//! deadline passes, a shutdown signal arrives, or the source fails.

use crate::{
    assembler::LineAssembler,
    classify::{CompletionTrigger, classify_line},
    completion::{CompletionDetector, MonitorState},
    config::MonitorSettings,
    errors::{SignalHandlerSetupError, SourceReadError},
    signal::{ShutdownEvent, SignalHandlerKind},
    source::ByteSource,
    stats::{Stats, StatsAggregator},
};
use std::{io::Write, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Watches a byte source until a Unity run finishes.
#[derive(Clone, Debug)]
pub struct MonitorLoop {
    settings: MonitorSettings,
    signal_handler: SignalHandlerKind,
}

impl MonitorLoop {
    /// Creates a new monitor loop.
    pub fn new(settings: MonitorSettings, signal_handler: SignalHandlerKind) -> Self {
        Self {
            settings,
            signal_handler,
        }
    }

    /// Runs the loop to completion.
    ///
    /// Raw bytes are written to `echo` as soon as they are read, before they're interpreted.
    /// Failing to echo is logged and otherwise ignored.
    ///
    /// This must be called from within a Tokio runtime with the time driver enabled.
    pub async fn run<S, W>(
        &self,
        mut source: S,
        echo: W,
    ) -> Result<MonitorOutcome, SignalHandlerSetupError>
    where
        S: ByteSource,
        W: Write,
    {
        let mut signals = self.signal_handler.build()?;
        let start = Instant::now();
        let mut session = Session::new(self.settings.timeout, echo);
        let mut buf = Vec::new();

        debug!(
            "monitoring {} (timeout: {:.3}s)",
            source.name(),
            self.settings.timeout.as_secs_f64()
        );

        let mut interrupt = loop {
            if session.detector.check_deadline(start.elapsed()) {
                warn!(
                    "no completion detected within {:.3}s",
                    session.detector.timeout().as_secs_f64()
                );
                break None;
            }

            buf.clear();
            let read = match source.read_available(&mut buf) {
                Ok(read) => read,
                Err(err) => {
                    break Some(MonitorInterrupt::Read(SourceReadError::new(
                        source.name(),
                        err,
                    )));
                }
            };
            if read > 0 {
                session.process_chunk(&buf);
            }
            if session.detector.state() == MonitorState::Completed {
                break None;
            }

            // Give a pending signal a chance to be observed between chunks. Sleep only when
            // there was nothing to read.
            let event = if read > 0 {
                tokio::select! {
                    biased;
                    Some(event) = signals.recv() => Some(event),
                    () = tokio::task::yield_now() => None,
                }
            } else {
                tokio::select! {
                    biased;
                    Some(event) = signals.recv() => Some(event),
                    () = tokio::time::sleep(self.settings.poll_interval) => None,
                }
            };
            if let Some(event) = event {
                warn!("received {event}, stopping");
                break Some(MonitorInterrupt::Signal(event));
            }
        };

        if session.detector.state() == MonitorState::Completed {
            interrupt = self.grace_drain(&mut source, &mut session, &mut buf).await;
        }

        if let Some(line) = session.assembler.flush() {
            debug!("flushing unterminated line");
            session.process_line(&line);
        }

        Ok(session.finish(interrupt, start.elapsed()))
    }

    async fn grace_drain<S: ByteSource, W: Write>(
        &self,
        source: &mut S,
        session: &mut Session<W>,
        buf: &mut Vec<u8>,
    ) -> Option<MonitorInterrupt> {
        tokio::time::sleep(self.settings.grace_period).await;

        // A source may hand out what it has in several pieces, so keep reading until it reports
        // nothing more.
        loop {
            buf.clear();
            match source.read_available(buf) {
                Ok(0) => return None,
                Ok(_) => session.process_chunk(buf),
                Err(err) => {
                    return Some(MonitorInterrupt::Read(SourceReadError::new(
                        source.name(),
                        err,
                    )));
                }
            }
        }
    }
}

/// The per-run state threaded through the loop.
struct Session<W> {
    assembler: LineAssembler,
    aggregator: StatsAggregator,
    detector: CompletionDetector,
    echo: W,
    echo_failed: bool,
}

impl<W: Write> Session<W> {
    fn new(timeout: Duration, echo: W) -> Self {
        Self {
            assembler: LineAssembler::new(),
            aggregator: StatsAggregator::new(),
            detector: CompletionDetector::new(timeout),
            echo,
            echo_failed: false,
        }
    }

    fn process_chunk(&mut self, chunk: &[u8]) {
        self.echo(chunk);
        for line in self.assembler.feed(chunk) {
            self.process_line(&line);
        }
    }

    fn process_line(&mut self, line: &str) {
        let event = classify_line(line);
        debug!("{line:?}: {event:?}");
        self.aggregator.apply(&event);
        if let Some(trigger) = self.detector.on_event(&event) {
            info!("detected {trigger}");
        }
    }

    fn echo(&mut self, chunk: &[u8]) {
        if self.echo_failed {
            return;
        }
        if let Err(err) = self.echo.write_all(chunk).and_then(|()| self.echo.flush()) {
            warn!("failed to echo device output, continuing without it: {err}");
            self.echo_failed = true;
        }
    }

    fn finish(self, interrupt: Option<MonitorInterrupt>, elapsed: Duration) -> MonitorOutcome {
        MonitorOutcome {
            state: self.detector.state(),
            trigger: self.detector.trigger(),
            stats: self.aggregator.into_stats(),
            interrupt,
            elapsed,
        }
    }
}

/// Why a monitoring session stopped before reaching a normal end.
#[derive(Debug)]
pub enum MonitorInterrupt {
    /// A shutdown signal was received.
    Signal(ShutdownEvent),

    /// Reading from the source failed.
    Read(SourceReadError),
}

/// The result of a monitoring session.
#[derive(Debug)]
pub struct MonitorOutcome {
    /// The state the session ended in.
    ///
    /// An interrupted session that never saw a completion trigger ends in
    /// [`MonitorState::Running`].
    pub state: MonitorState,

    /// The trigger that completed the run, if any.
    pub trigger: Option<CompletionTrigger>,

    /// Statistics collected over the session.
    pub stats: Stats,

    /// Set if the session was cut short by a signal or a read error.
    pub interrupt: Option<MonitorInterrupt>,

    /// How long the session took.
    pub elapsed: Duration,
}

impl MonitorOutcome {
    /// Returns true if a completion trigger was seen.
    ///
    /// This says nothing about whether the tests passed.
    pub fn is_completed(&self) -> bool {
        self.state == MonitorState::Completed
    }

    /// Returns true if the run completed without interruption, at least one test ran, and none
    /// failed.
    pub fn is_success(&self) -> bool {
        self.is_completed() && self.interrupt.is_none() && self.stats.is_success()
    }
}
