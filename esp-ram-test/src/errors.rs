// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use unity_monitor::{errors::*, exit_codes::RamTestExitCode};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that esp-ram-test knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    GetCurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: camino::FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("serial open error")]
    SerialOpenError {
        #[from]
        err: SerialOpenError,
    },
    #[error("replay open error")]
    ReplayOpenError {
        #[from]
        err: ReplayOpenError,
    },
    #[error("load RAM error")]
    LoadRamError {
        #[from]
        err: LoadRamError,
    },
    #[error("signal handler setup error")]
    SignalHandlerSetupError {
        #[from]
        err: SignalHandlerSetupError,
    },
    #[error("runtime build error")]
    RuntimeBuildError {
        #[source]
        err: std::io::Error,
    },
    #[error("source read error")]
    SourceReadError {
        #[from]
        err: SourceReadError,
    },
    #[error("write output error")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::GetCurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::SerialOpenError { .. }
            | Self::ReplayOpenError { .. }
            | Self::LoadRamError { .. }
            | Self::SignalHandlerSetupError { .. }
            | Self::RuntimeBuildError { .. }
            | Self::SourceReadError { .. }
            | Self::WriteOutputError { .. } => RamTestExitCode::FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::GetCurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!("current directory is not valid UTF-8");
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::SerialOpenError { err } => {
                error!(
                    "failed to open serial port `{}`",
                    err.path().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ReplayOpenError { err } => {
                error!("{err}");
                err.source()
            }
            Self::LoadRamError { err } => {
                match err {
                    LoadRamError::BinaryNotFound { path } => {
                        error!("binary file not found: `{}`", path.style(styles.bold));
                        None
                    }
                    LoadRamError::Version(err) => {
                        error!("failed to determine esptool version");
                        Some(err as &dyn Error)
                    }
                    LoadRamError::Exec { command, err } => {
                        error!("failed to execute `{}`", command.style(styles.bold));
                        Some(err as &dyn Error)
                    }
                    // The message already carries esptool's stderr.
                    other => {
                        error!("failed to load binary into RAM");
                        Some(other as &dyn Error)
                    }
                }
            }
            Self::SignalHandlerSetupError { err } => {
                error!("error setting up signal handler");
                Some(err as &dyn Error)
            }
            Self::RuntimeBuildError { err } => {
                error!("error creating async runtime");
                Some(err as &dyn Error)
            }
            Self::SourceReadError { err } => {
                error!("error reading from {}", err.source_name().style(styles.bold));
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
