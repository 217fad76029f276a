// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading firmware into device RAM through esptool.
//!
//! esptool renamed its subcommands from `snake_case` to `kebab-case` in version 5. Before loading,
//! [`EsptoolCli`] asks the installed esptool for its version and picks the spelling it
//! understands.

use crate::errors::{EsptoolVersionError, LoadRamError};
use camino::Utf8Path;
use semver::Version;
use std::borrow::Cow;
use tracing::{debug, info, trace};

/// A handle to an esptool executable.
#[derive(Clone, Debug)]
pub struct EsptoolCli {
    esptool: String,
}

impl EsptoolCli {
    /// Creates a new handle to the esptool executable named `esptool`.
    ///
    /// The name is looked up in `PATH` when it isn't a path.
    pub fn new(esptool: impl Into<String>) -> Self {
        Self {
            esptool: esptool.into(),
        }
    }

    /// Runs `esptool version` and works out what the installed esptool supports.
    pub fn capabilities(&self) -> Result<EsptoolCapabilities, EsptoolVersionError> {
        let args = ["version"];
        let command = self.display_command(&args);
        let expression = duct::cmd(self.esptool.as_str(), args);
        trace!("executing command: {command}");

        let output = expression
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| EsptoolVersionError::Exec {
                command: command.clone(),
                err,
            })?;
        if !output.status.success() {
            return Err(EsptoolVersionError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = parse_version_output(&stdout).ok_or_else(|| {
            EsptoolVersionError::NoVersion {
                command,
                output: stdout.into_owned(),
            }
        })?;
        Ok(EsptoolCapabilities::new(version))
    }

    /// Loads a binary into the RAM of the device attached to `request.port` and starts it.
    ///
    /// The device's serial port should already be open so that output produced right after the
    /// binary starts is not lost.
    pub fn load_ram(&self, request: &LoadRamRequest<'_>) -> Result<(), LoadRamError> {
        if !request.binary.exists() {
            return Err(LoadRamError::BinaryNotFound {
                path: request.binary.to_owned(),
            });
        }

        let capabilities = self.capabilities()?;
        debug!(
            "esptool {} uses `{}`",
            capabilities.version(),
            capabilities.load_ram_command()
        );
        let args = request.to_args(&capabilities);
        let command = self.display_command(&args);
        info!("loading {} into RAM of {}", request.binary, request.chip);
        trace!("executing command: {command}");

        let output = duct::cmd(self.esptool.as_str(), args.iter().map(|arg| &**arg))
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| LoadRamError::Exec {
                command: command.clone(),
                err,
            })?;
        if !output.status.success() {
            debug!("stdout:\n{}", String::from_utf8_lossy(&output.stdout));
            return Err(LoadRamError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }

    fn display_command<S: AsRef<str>>(&self, args: &[S]) -> String {
        let words = std::iter::once(self.esptool.as_str()).chain(args.iter().map(AsRef::as_ref));
        shell_words::join(words)
    }
}

/// What the installed esptool supports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EsptoolCapabilities {
    version: Version,
}

impl EsptoolCapabilities {
    /// The first esptool version that spells its subcommands in `kebab-case`.
    pub const KEBAB_CASE_VERSION: Version = Version::new(5, 0, 0);

    /// Creates capabilities for the given esptool version.
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Returns the esptool version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the subcommand that loads a binary into RAM.
    pub fn load_ram_command(&self) -> &'static str {
        // Pre-release builds of 5.0.0 already use the new spelling.
        let release = Version::new(self.version.major, self.version.minor, self.version.patch);
        if release >= Self::KEBAB_CASE_VERSION {
            "load-ram"
        } else {
            "load_ram"
        }
    }
}

/// A request to load a binary into RAM.
#[derive(Clone, Debug)]
pub struct LoadRamRequest<'a> {
    /// The target chip, e.g. `esp32c3`.
    pub chip: &'a str,

    /// The serial port the device is attached to.
    pub port: &'a Utf8Path,

    /// The baud rate to use for the transfer.
    pub baud_rate: u32,

    /// The binary to load.
    pub binary: &'a Utf8Path,
}

impl<'a> LoadRamRequest<'a> {
    fn to_args(&self, capabilities: &EsptoolCapabilities) -> Vec<Cow<'a, str>> {
        vec![
            "--chip".into(),
            self.chip.into(),
            "--port".into(),
            self.port.as_str().into(),
            "--baud".into(),
            self.baud_rate.to_string().into(),
            capabilities.load_ram_command().into(),
            self.binary.as_str().into(),
        ]
    }
}

/// Finds the esptool version in the output of `esptool version`.
///
/// The last whitespace-separated token that looks like a version wins. A leading `v` is accepted,
/// and a missing patch component is treated as zero.
pub fn parse_version_output(output: &str) -> Option<Version> {
    output
        .split_whitespace()
        .rev()
        .find_map(parse_version_token)
}

fn parse_version_token(token: &str) -> Option<Version> {
    let token = token.strip_prefix('v').unwrap_or(token);
    if let Ok(version) = Version::parse(token) {
        return Some(version);
    }
    // esptool has printed two-component versions in the past.
    let (major, minor) = token.split_once('.')?;
    Some(Version::new(major.parse().ok()?, minor.parse().ok()?, 0))
}
