// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by unity-monitor.

use camino::Utf8PathBuf;
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse esp-ram-test config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<ConfigError>),

    /// A duration in the config was zero.
    #[error("`{key}` must be greater than zero")]
    ZeroDuration {
        /// The key that was zero.
        key: &'static str,
    },
}

/// An error that occurred while opening and configuring a serial port.
#[derive(Debug, Error)]
#[error("failed to open serial port `{path}`")]
pub struct SerialOpenError {
    path: Utf8PathBuf,
    #[source]
    kind: SerialOpenErrorKind,
}

impl SerialOpenError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: SerialOpenErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the path to the serial port.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &SerialOpenErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while opening a serial port.
///
/// Returned by [`SerialOpenError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerialOpenErrorKind {
    /// The device node could not be opened.
    #[error("error opening device")]
    Open(#[source] std::io::Error),

    /// The terminal attributes could not be read or applied.
    #[error("error configuring terminal attributes")]
    Configure(#[source] std::io::Error),

    /// The requested baud rate isn't one of the supported rates.
    #[error("unsupported baud rate {baud_rate} (supported: {})", supported_list(.supported))]
    UnsupportedBaudRate {
        /// The requested baud rate.
        baud_rate: u32,

        /// The supported baud rates.
        supported: &'static [u32],
    },

    /// Serial ports aren't supported on this platform.
    #[error("serial ports are not supported on this platform")]
    UnsupportedPlatform,
}

fn supported_list(rates: &[u32]) -> String {
    rates
        .iter()
        .map(|rate| rate.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// An error that occurred while reading from a [`ByteSource`](crate::source::ByteSource).
///
/// Read errors are fatal to a monitoring session.
#[derive(Debug, Error)]
#[error("error reading from {source_name}")]
pub struct SourceReadError {
    source_name: String,
    #[source]
    err: std::io::Error,
}

impl SourceReadError {
    /// Creates a new `SourceReadError`.
    pub fn new(source_name: impl Into<String>, err: std::io::Error) -> Self {
        Self {
            source_name: source_name.into(),
            err,
        }
    }

    /// Returns a description of the source that failed.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

/// An error that occurred while opening a replay log.
#[derive(Debug, Error)]
#[error("failed to open replay log `{path}`")]
pub struct ReplayOpenError {
    path: Utf8PathBuf,
    #[source]
    err: std::io::Error,
}

impl ReplayOpenError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self {
            path: path.into(),
            err,
        }
    }
}

/// An error that occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SignalHandlerSetupError(#[from] std::io::Error);

/// An error that occurred while determining the installed esptool's version.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EsptoolVersionError {
    /// esptool could not be executed.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// esptool exited with a failure.
    #[error("`{command}` failed with {status}\nstderr:\n{stderr}")]
    Failed {
        /// The command that was run.
        command: String,

        /// The exit status.
        status: std::process::ExitStatus,

        /// The captured standard error.
        stderr: String,
    },

    /// No version could be found in the output.
    #[error("could not find a version in the output of `{command}`:\n{output}")]
    NoVersion {
        /// The command that was run.
        command: String,

        /// The captured standard output.
        output: String,
    },
}

/// An error that occurred while loading a binary into device RAM.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadRamError {
    /// The binary to load doesn't exist.
    #[error("binary file not found: `{path}`")]
    BinaryNotFound {
        /// The path to the binary.
        path: Utf8PathBuf,
    },

    /// The esptool version could not be determined.
    #[error("failed to negotiate esptool capabilities")]
    Version(#[from] EsptoolVersionError),

    /// esptool could not be executed.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// esptool exited with a failure.
    #[error("`{command}` failed with {status}\nstderr:\n{stderr}")]
    Failed {
        /// The command that was run.
        command: String,

        /// The exit status.
        status: std::process::ExitStatus,

        /// The captured standard error.
        stderr: String,
    },
}
