// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown signals.
//!
//! A monitoring session only cares whether the user wants it to stop. SIGINT, SIGTERM and SIGHUP
//! (Ctrl-C on Windows) each end the session, after which the statistics gathered so far are still
//! reported. No signal is forwarded anywhere, since nothing is spawned while monitoring.

use crate::errors::SignalHandlerSetupError;
use std::fmt;

/// Whether a monitoring session listens for shutdown signals.
///
/// Passed into [`MonitorLoop::new`](crate::monitor::MonitorLoop::new).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SignalHandlerKind {
    /// Stop the session on SIGINT, SIGTERM or SIGHUP (Ctrl-C on Windows).
    Standard,

    /// Never stop the session because of a signal. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    pub(crate) fn build(self) -> Result<SignalHandler, SignalHandlerSetupError> {
        let listeners = match self {
            Self::Standard => Some(imp::Listeners::install()?),
            Self::Noop => None,
        };
        Ok(SignalHandler { listeners })
    }
}

/// Shutdown listeners for one session.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    listeners: Option<imp::Listeners>,
}

impl SignalHandler {
    /// Waits for the next shutdown signal.
    ///
    /// Returns `None` once no more signals can arrive, immediately so for a no-op handler.
    pub(crate) async fn recv(&mut self) -> Option<ShutdownEvent> {
        self.listeners.as_mut()?.next_shutdown().await
    }
}

#[cfg(unix)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    /// One listener per shutdown signal. A listener is dropped once its stream ends.
    #[derive(Debug)]
    pub(super) struct Listeners {
        interrupt: Option<Signal>,
        term: Option<Signal>,
        hangup: Option<Signal>,
    }

    impl Listeners {
        pub(super) fn install() -> std::io::Result<Self> {
            Ok(Self {
                interrupt: Some(signal(SignalKind::interrupt())?),
                term: Some(signal(SignalKind::terminate())?),
                hangup: Some(signal(SignalKind::hangup())?),
            })
        }

        pub(super) async fn next_shutdown(&mut self) -> Option<ShutdownEvent> {
            loop {
                let (event, delivered) = tokio::select! {
                    delivered = wait_for(&mut self.interrupt), if self.interrupt.is_some() => {
                        (ShutdownEvent::Interrupt, delivered)
                    }
                    delivered = wait_for(&mut self.term), if self.term.is_some() => {
                        (ShutdownEvent::Term, delivered)
                    }
                    delivered = wait_for(&mut self.hangup), if self.hangup.is_some() => {
                        (ShutdownEvent::Hangup, delivered)
                    }
                    else => return None,
                };
                if delivered {
                    return Some(event);
                }
            }
        }
    }

    /// Waits for the signal behind `listener`. Returns false, and clears the listener, if its
    /// stream ended instead.
    async fn wait_for(listener: &mut Option<Signal>) -> bool {
        let Some(signal) = listener else {
            return false;
        };
        if signal.recv().await.is_some() {
            return true;
        }
        *listener = None;
        false
    }
}

#[cfg(windows)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    /// The Ctrl-C listener, dropped once its stream ends.
    #[derive(Debug)]
    pub(super) struct Listeners {
        ctrl_c: Option<CtrlC>,
    }

    impl Listeners {
        pub(super) fn install() -> std::io::Result<Self> {
            Ok(Self {
                ctrl_c: Some(ctrl_c()?),
            })
        }

        pub(super) async fn next_shutdown(&mut self) -> Option<ShutdownEvent> {
            let ctrl_c = self.ctrl_c.as_mut()?;
            match ctrl_c.recv().await {
                Some(()) => Some(ShutdownEvent::Interrupt),
                None => {
                    self.ctrl_c = None;
                    None
                }
            }
        }
    }
}

/// A signal event that stops a monitoring session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShutdownEvent {
    /// SIGHUP.
    #[cfg(unix)]
    Hangup,

    /// SIGTERM.
    #[cfg(unix)]
    Term,

    /// SIGINT or Ctrl-C.
    Interrupt,
}

impl fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Hangup => write!(f, "SIGHUP"),
            #[cfg(unix)]
            Self::Term => write!(f, "SIGTERM"),
            Self::Interrupt => write!(f, "interrupt"),
        }
    }
}
