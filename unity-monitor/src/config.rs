// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for esp-ram-test.
//!
//! Settings are layered: the embedded [default config](RamTestConfig::DEFAULT_CONFIG) comes first,
//! then an optional TOML file. Command-line arguments are applied on top of the result by the
//! caller.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Trait for handling configuration warnings.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs configuration warnings through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let keys = unknown
            .iter()
            .map(|key| format!("  - {key}"))
            .collect::<Vec<_>>()
            .join("\n");
        warn!("ignoring unknown configuration keys in config file {config_file}:\n{keys}");
    }
}

/// Overall configuration for esp-ram-test.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RamTestConfig {
    monitor: MonitorSettings,
    serial: SerialSettings,
    loader: LoaderSettings,
}

impl RamTestConfig {
    /// The default location of the config within the current directory.
    pub const CONFIG_PATH: &'static str = ".config/esp-ram-test.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the provided file, or `<dir>/.config/esp-ram-test.toml` if it
    /// exists, layered on top of the default config. Unknown keys are logged as warnings.
    pub fn from_sources(
        dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(dir, config_file, &mut DefaultConfigWarnings)
    }

    /// Like [`Self::from_sources`], but reports unknown keys to `warnings`.
    pub fn from_sources_with_warnings(
        dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        // An explicitly provided file must exist, but the default location is optional.
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let config = builder.build().map_err(|error| {
            ConfigParseError::new(
                &config_file,
                ConfigParseErrorKind::BuildError(Box::new(error)),
            )
        })?;

        let mut unknown = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            unknown.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let this = Self::deserialize(ignored_de).map_err(|error| {
            ConfigParseError::new(
                &config_file,
                ConfigParseErrorKind::DeserializeError(Box::new(error)),
            )
        })?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &unknown);
        }

        this.validate()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        Ok(this)
    }

    /// Returns the config with only the embedded defaults applied.
    pub fn default_config() -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");
        Self::deserialize(config).expect("default config is always valid")
    }

    /// Returns the monitor settings.
    pub fn monitor(&self) -> &MonitorSettings {
        &self.monitor
    }

    /// Returns the serial port settings.
    pub fn serial(&self) -> &SerialSettings {
        &self.serial
    }

    /// Returns the loader settings.
    pub fn loader(&self) -> &LoaderSettings {
        &self.loader
    }

    fn make_default_config() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        if self.monitor.timeout.is_zero() {
            return Err(ConfigParseErrorKind::ZeroDuration {
                key: "monitor.timeout",
            });
        }
        if self.monitor.poll_interval.is_zero() {
            return Err(ConfigParseErrorKind::ZeroDuration {
                key: "monitor.poll-interval",
            });
        }
        Ok(())
    }
}

/// Timing settings for a monitoring session.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct MonitorSettings {
    /// How long to wait for the run to complete.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// How long to sleep when a poll returns no data.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// How long to wait after completion before the final drain.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
}

impl MonitorSettings {
    /// Returns a copy of these settings with the timeout replaced.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SerialSettings {
    /// Path to the serial device.
    pub port: Utf8PathBuf,

    /// The baud rate to configure.
    pub baud_rate: u32,
}

/// Settings for the RAM loader.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct LoaderSettings {
    /// The esptool executable.
    pub esptool: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct CollectWarnings {
        unknown: Vec<(Utf8PathBuf, BTreeSet<String>)>,
    }

    impl ConfigWarnings for CollectWarnings {
        fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
            self.unknown.push((config_file.to_owned(), unknown.clone()));
        }
    }

    fn write_config(dir: &Utf8TempDir, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join(RamTestConfig::CONFIG_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = RamTestConfig::default_config();
        assert_eq!(
            *config.monitor(),
            MonitorSettings {
                timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
                grace_period: Duration::from_millis(500),
            }
        );
        assert_eq!(config.serial().port, "/dev/ttyUSB0");
        assert_eq!(config.serial().baud_rate, 115_200);
        assert_eq!(config.loader().esptool, "esptool.py");
    }

    #[test]
    fn test_missing_default_location_is_fine() {
        let dir = Utf8TempDir::new().unwrap();
        let mut warnings = CollectWarnings::default();
        let config =
            RamTestConfig::from_sources_with_warnings(dir.path(), None, &mut warnings).unwrap();
        assert_eq!(config.monitor().timeout, Duration::from_secs(5));
        assert!(warnings.unknown.is_empty());
    }

    #[test]
    fn test_overrides_and_unknown_keys() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [monitor]
                timeout = "1m 30s"
                retries = 3

                [serial]
                port = "/dev/ttyACM0"
            "#},
        );

        let mut warnings = CollectWarnings::default();
        let config =
            RamTestConfig::from_sources_with_warnings(dir.path(), None, &mut warnings).unwrap();

        assert_eq!(config.monitor().timeout, Duration::from_secs(90));
        assert_eq!(config.monitor().poll_interval, Duration::from_millis(10));
        assert_eq!(config.serial().port, "/dev/ttyACM0");
        assert_eq!(config.serial().baud_rate, 115_200);
        assert_eq!(
            warnings.unknown,
            [(path, BTreeSet::from(["monitor.retries".to_owned()]))]
        );
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = Utf8TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let error = RamTestConfig::from_sources(dir.path(), Some(&missing)).unwrap_err();
        assert_eq!(error.config_file(), &missing);
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::BuildError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test]
    fn test_invalid_duration() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(&dir, "[monitor]\ntimeout = \"soon\"\n");
        let error = RamTestConfig::from_sources(dir.path(), None).unwrap_err();
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::DeserializeError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test]
    fn test_zero_timeout() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(&dir, "[monitor]\ntimeout = \"0s\"\n");
        let error = RamTestConfig::from_sources(dir.path(), None).unwrap_err();
        assert!(
            matches!(
                error.kind(),
                ConfigParseErrorKind::ZeroDuration {
                    key: "monitor.timeout"
                }
            ),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }
}
