// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte sources that the monitor reads from.
//!
//! A [`ByteSource`] hands over whatever bytes are currently available without blocking. The
//! monitor loop owns the pacing: when a source has nothing to offer, the loop sleeps for its poll
//! interval and asks again.

use crate::errors::{ReplayOpenError, SerialOpenError, SerialOpenErrorKind};
use camino::Utf8Path;
use std::{
    fs::File,
    io::{self, Read},
};

/// A non-blocking source of raw bytes.
pub trait ByteSource {
    /// A short description of this source, used in error messages.
    fn name(&self) -> &str;

    /// Appends bytes that are currently available to `buf`, returning the number of bytes
    /// appended.
    ///
    /// A source may return less than everything it has, in which case the next read returns
    /// more. Returns `Ok(0)` if nothing is available right now. This must not block waiting for
    /// data.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        (**self).read_available(buf)
    }
}

/// Baud rates accepted by [`SerialPort::open`].
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    9600, 19200, 38400, 57600, 115_200, 230_400, 460_800, 921_600,
];

const READ_CHUNK: usize = 4096;

/// A serial port opened in raw, non-blocking mode.
///
/// The underlying descriptor is closed when the port is dropped.
#[derive(Debug)]
pub struct SerialPort {
    name: String,
    #[cfg(unix)]
    file: File,
    #[cfg(not(unix))]
    never: std::convert::Infallible,
}

impl SerialPort {
    /// Opens the tty at `path` and configures it for raw input at `baud_rate`.
    ///
    /// Bytes the device has already sent and the kernel has buffered remain available for the
    /// first read.
    pub fn open(path: &Utf8Path, baud_rate: u32) -> Result<Self, SerialOpenError> {
        if !SUPPORTED_BAUD_RATES.contains(&baud_rate) {
            return Err(SerialOpenError::new(
                path,
                SerialOpenErrorKind::UnsupportedBaudRate {
                    baud_rate,
                    supported: SUPPORTED_BAUD_RATES,
                },
            ));
        }
        Self::open_imp(path, baud_rate)
    }

    #[cfg(unix)]
    fn open_imp(path: &Utf8Path, baud_rate: u32) -> Result<Self, SerialOpenError> {
        use std::os::unix::fs::OpenOptionsExt;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)
            .map_err(|err| SerialOpenError::new(path, SerialOpenErrorKind::Open(err)))?;

        unix::configure(&file, baud_rate)
            .map_err(|err| SerialOpenError::new(path, SerialOpenErrorKind::Configure(err)))?;

        Ok(Self {
            name: format!("serial port `{path}`"),
            file,
        })
    }

    #[cfg(not(unix))]
    fn open_imp(path: &Utf8Path, _baud_rate: u32) -> Result<Self, SerialOpenError> {
        Err(SerialOpenError::new(
            path,
            SerialOpenErrorKind::UnsupportedPlatform,
        ))
    }
}

impl ByteSource for SerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    #[cfg(unix)]
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    #[cfg(not(unix))]
    fn read_available(&mut self, _buf: &mut Vec<u8>) -> io::Result<usize> {
        match self.never {}
    }
}

#[cfg(unix)]
mod unix {
    use nix::sys::termios::{
        BaudRate, ControlFlags, SetArg, cfmakeraw, cfsetspeed, tcgetattr, tcsetattr,
    };
    use std::{fs::File, io};

    pub(super) fn configure(file: &File, baud_rate: u32) -> io::Result<()> {
        let mut termios = tcgetattr(file)?;
        cfmakeraw(&mut termios);
        cfsetspeed(&mut termios, to_baud_rate(baud_rate)?)?;
        // Ignore modem control lines and enable the receiver.
        termios.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tcsetattr(file, SetArg::TCSANOW, &termios)?;
        Ok(())
    }

    fn to_baud_rate(baud_rate: u32) -> io::Result<BaudRate> {
        let rate = match baud_rate {
            9600 => BaudRate::B9600,
            19200 => BaudRate::B19200,
            38400 => BaudRate::B38400,
            57600 => BaudRate::B57600,
            115_200 => BaudRate::B115200,
            230_400 => BaudRate::B230400,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            460_800 => BaudRate::B460800,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            921_600 => BaudRate::B921600,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("baud rate {other} is not available on this platform"),
                ));
            }
        };
        Ok(rate)
    }
}

/// The number of bytes [`ReplaySource`] returns per read by default.
pub const DEFAULT_REPLAY_CHUNK: usize = 64;

/// Replays a previously captured log as if it were arriving from a device.
///
/// Each read returns at most one chunk. Once the log is exhausted, reads report no data.
pub struct ReplaySource {
    name: String,
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
    exhausted: bool,
}

impl ReplaySource {
    /// Opens the log at `path`.
    pub fn open(path: &Utf8Path) -> Result<Self, ReplayOpenError> {
        let file = File::open(path).map_err(|err| ReplayOpenError::new(path, err))?;
        Ok(Self::from_reader(format!("replay log `{path}`"), file))
    }

    /// Creates a replay source over an arbitrary reader.
    pub fn from_reader(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
            chunk_size: DEFAULT_REPLAY_CHUNK,
            exhausted: false,
        }
    }

    /// Sets the maximum number of bytes returned per read. A size of 0 is treated as 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns true once the whole log has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl std::fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySource")
            .field("name", &self.name)
            .field("chunk_size", &self.chunk_size)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl ByteSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        if self.exhausted {
            return Ok(0);
        }
        let start = buf.len();
        buf.resize(start + self.chunk_size, 0);
        let result = loop {
            match self.reader.read(&mut buf[start..]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match result {
            Ok(n) => {
                buf.truncate(start + n);
                if n == 0 {
                    self.exhausted = true;
                }
                Ok(n)
            }
            Err(err) => {
                buf.truncate(start);
                Err(err)
            }
        }
    }
}
