// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detection of the end of a monitored test run.

use crate::classify::{CompletionTrigger, LineEvent};
use std::time::Duration;

/// The state of a monitoring session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MonitorState {
    /// No completion trigger has been seen and the deadline hasn't passed.
    Running,

    /// A completion trigger was seen.
    Completed,

    /// The deadline passed before any completion trigger was seen.
    TimedOut,
}

impl MonitorState {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Tracks whether a run has completed or timed out.
///
/// Whichever terminal condition is observed first wins. Once the detector has left
/// [`MonitorState::Running`], all further events and deadline checks are no-ops.
#[derive(Clone, Debug)]
pub struct CompletionDetector {
    timeout: Duration,
    state: MonitorState,
    trigger: Option<CompletionTrigger>,
}

impl CompletionDetector {
    /// Creates a new detector which times out once `timeout` has elapsed.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: MonitorState::Running,
            trigger: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Returns the trigger that completed the run, if any.
    pub fn trigger(&self) -> Option<CompletionTrigger> {
        self.trigger
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feeds a classified line into the detector.
    ///
    /// Returns the trigger if this event is the one that completed the run.
    pub fn on_event(&mut self, event: &LineEvent) -> Option<CompletionTrigger> {
        if self.state.is_terminal() {
            return None;
        }
        let trigger = event.completion_trigger()?;
        self.state = MonitorState::Completed;
        self.trigger = Some(trigger);
        Some(trigger)
    }

    /// Checks the elapsed time against the deadline.
    ///
    /// Returns true if this check is the one that timed the run out.
    pub fn check_deadline(&mut self, elapsed: Duration) -> bool {
        if self.state.is_terminal() || elapsed < self.timeout {
            return false;
        }
        self.state = MonitorState::TimedOut;
        true
    }
}
