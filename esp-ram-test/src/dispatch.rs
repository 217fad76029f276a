// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use std::{io::Write, time::Duration};
use tracing::{error, info, warn};
use unity_monitor::{
    config::{MonitorSettings, RamTestConfig},
    exit_codes::RamTestExitCode,
    loader::{EsptoolCli, LoadRamRequest},
    monitor::{MonitorInterrupt, MonitorLoop, MonitorOutcome},
    reporter::render_summary,
    signal::SignalHandlerKind,
    source::{ByteSource, ReplaySource, SerialPort},
};

/// Load a Unity test binary into the RAM of an Espressif chip and report the results.
///
/// The binary's output is echoed as it arrives over the serial port. Once Unity reports that the
/// run is over (or the timeout passes), a summary is printed and the process exits with 0 if every
/// test passed.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct RamTestApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl RamTestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let cwd = current_dir()?;
        let config = self.config_opts.make_config(&cwd)?;
        self.command.exec(&config, output, output_writer)
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: .config/esp-ram-test.toml]
    #[arg(long, global = true, value_name = "PATH", env = "ESP_RAM_TEST_CONFIG_FILE")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, cwd: &Utf8Path) -> Result<RamTestConfig> {
        Ok(RamTestConfig::from_sources(cwd, self.config_file.as_deref())?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a binary into RAM and monitor its test output
    ///
    /// The serial port is opened before the binary is loaded, so that output printed immediately
    /// after the jump to RAM isn't lost.
    Run {
        /// ESP chip type, e.g. esp32c3
        #[arg(long, short = 'c', env = "ESP_RAM_TEST_CHIP")]
        chip: String,

        /// Path to the test binary
        #[arg(long = "binary", short = 'f', value_name = "PATH")]
        binary: Utf8PathBuf,

        #[command(flatten)]
        serial_opts: SerialOpts,

        #[command(flatten)]
        monitor_opts: MonitorOpts,

        /// The esptool executable [default: from config]
        #[arg(long, value_name = "PROGRAM", env = "ESP_RAM_TEST_ESPTOOL")]
        esptool: Option<String>,
    },

    /// Monitor test output from a device that is already running
    Monitor {
        #[command(flatten)]
        serial_opts: SerialOpts,

        #[command(flatten)]
        monitor_opts: MonitorOpts,
    },

    /// Evaluate a previously captured serial log
    Replay {
        /// Path to the captured log
        #[arg(value_name = "LOG")]
        log: Utf8PathBuf,

        #[command(flatten)]
        monitor_opts: MonitorOpts,
    },
}

impl Command {
    fn exec(
        self,
        config: &RamTestConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        match self {
            Self::Run {
                chip,
                binary,
                serial_opts,
                monitor_opts,
                esptool,
            } => {
                let (port_path, baud_rate) = serial_opts.resolve(config);
                let port = SerialPort::open(&port_path, baud_rate)?;

                let esptool = esptool.unwrap_or_else(|| config.loader().esptool.clone());
                EsptoolCli::new(esptool).load_ram(&LoadRamRequest {
                    chip: &chip,
                    port: &port_path,
                    baud_rate,
                    binary: &binary,
                })?;

                let settings = monitor_opts.resolve(config);
                run_monitor(port, settings, output, output_writer)
            }
            Self::Monitor {
                serial_opts,
                monitor_opts,
            } => {
                let (port_path, baud_rate) = serial_opts.resolve(config);
                let port = SerialPort::open(&port_path, baud_rate)?;
                let settings = monitor_opts.resolve(config);
                run_monitor(port, settings, output, output_writer)
            }
            Self::Replay { log, monitor_opts } => {
                let source = ReplaySource::open(&log)?;
                let settings = monitor_opts.resolve(config);
                run_monitor(source, settings, output, output_writer)
            }
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Serial options")]
struct SerialOpts {
    /// Serial port [default: from config, /dev/ttyUSB0]
    #[arg(long, short = 'p', value_name = "PATH", env = "ESP_RAM_TEST_PORT")]
    port: Option<Utf8PathBuf>,

    /// Baud rate [default: from config, 115200]
    #[arg(long, short = 'b', value_name = "RATE", env = "ESP_RAM_TEST_BAUD")]
    baud: Option<u32>,
}

impl SerialOpts {
    fn resolve(self, config: &RamTestConfig) -> (Utf8PathBuf, u32) {
        let port = self.port.unwrap_or_else(|| config.serial().port.clone());
        let baud = self.baud.unwrap_or(config.serial().baud_rate);
        (port, baud)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Monitor options")]
struct MonitorOpts {
    /// Test timeout, in seconds or as a duration like `1m30s` [default: from config, 5s]
    #[arg(
        long,
        short = 't',
        value_name = "DURATION",
        value_parser = parse_timeout,
        env = "ESP_RAM_TEST_TIMEOUT"
    )]
    timeout: Option<Duration>,
}

impl MonitorOpts {
    fn resolve(self, config: &RamTestConfig) -> MonitorSettings {
        let settings = *config.monitor();
        match self.timeout {
            Some(timeout) => settings.with_timeout(timeout),
            None => settings,
        }
    }
}

/// Parses a timeout given either as whole seconds or as a humantime duration.
fn parse_timeout(input: &str) -> Result<Duration, String> {
    let timeout = match input.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(input).map_err(|err| err.to_string())?,
    };
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_owned());
    }
    Ok(timeout)
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|err| ExpectedError::GetCurrentDirFailed { err })?;
    Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { err })
}

fn run_monitor<S: ByteSource>(
    source: S,
    settings: MonitorSettings,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExpectedError::RuntimeBuildError { err })?;
    let monitor = MonitorLoop::new(settings, SignalHandlerKind::Standard);
    monitor_and_report(&runtime, &monitor, source, output, output_writer)
}

fn monitor_and_report<S: ByteSource>(
    runtime: &tokio::runtime::Runtime,
    monitor: &MonitorLoop,
    source: S,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    info!("monitoring Unity test execution...");

    let mut stdout = output_writer.stdout_writer();
    let outcome = runtime.block_on(monitor.run(source, &mut stdout))?;

    let summary = render_summary(&outcome.stats, &output.report_styles());
    writeln!(stdout, "\n{summary}")
        .and_then(|()| stdout.flush())
        .map_err(|err| ExpectedError::WriteOutputError { err })?;

    report_outcome(outcome)
}

/// Logs the verdict for a finished session and returns the exit code.
fn report_outcome(outcome: MonitorOutcome) -> Result<i32> {
    let success = outcome.is_success();
    let completed = outcome.is_completed();

    match outcome.interrupt {
        Some(MonitorInterrupt::Read(err)) => return Err(err.into()),
        Some(MonitorInterrupt::Signal(event)) => {
            error!("test monitoring interrupted by {event}");
        }
        None if completed => {
            info!("Unity test execution completed!");
            if success {
                info!("all Unity tests passed!");
            } else {
                warn!(
                    "Unity tests completed with {} failures",
                    outcome.stats.tests_failed
                );
            }
        }
        None => {
            error!("test monitoring timed out or failed to detect completion");
        }
    }

    Ok(RamTestExitCode::from_success(success))
}
