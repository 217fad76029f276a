// Copyright (c) The esp-ram-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reassembly of serial output into lines.
//!
//! Bytes arrive in whatever chunks the transport hands out. A chunk can end in the middle of a
//! line, or even in the middle of a multi-byte UTF-8 sequence, so bytes are buffered until a `\n`
//! is seen and only complete lines are decoded. This makes assembly independent of where chunk
//! boundaries fall: the same total input always produces the same lines.

use bstr::ByteSlice;

/// Turns arbitrary byte chunks into complete text lines.
///
/// Any bytes after the last `\n` are retained and prefixed to the next chunk. Call
/// [`flush`](Self::flush) once the stream ends to get the unterminated remainder.
#[derive(Clone, Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    /// Creates a new, empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk into the assembler, returning every line completed by it, in order.
    ///
    /// Returned lines do not include the `\n` terminator, but are otherwise untrimmed (a `\r`
    /// before the `\n` is kept). Invalid UTF-8 is dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buf[start..].find_byte(b'\n') {
            let end = start + pos;
            lines.push(decode_permissive(&self.buf[start..end]));
            start = end + 1;
        }
        self.buf.drain(..start);

        lines
    }

    /// Returns the residual, unterminated bytes as a final line, if there are any.
    ///
    /// The buffer is empty afterwards.
    pub fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let residual = std::mem::take(&mut self.buf);
        let line = decode_permissive(&residual);
        (!line.is_empty()).then_some(line)
    }

    /// Returns the bytes currently buffered without a terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Decodes bytes as UTF-8, skipping invalid sequences.
fn decode_permissive(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
