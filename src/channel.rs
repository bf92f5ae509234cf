//! I/O channels the engine talks to for `,` and `.`.
//!
//! The engine never touches process stdio directly. Callers hand it an
//! [`InputSource`] and an [`OutputSink`]; the CLI wires them to stdin/stdout,
//! tests use the in-memory buffers.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::tape::CellWidth;

/// Where `,` gets its values from.
pub trait InputSource {
    /// The next input value, or `Ok(None)` at end of input.
    fn read_value(&mut self) -> io::Result<Option<u64>>;
}

/// Where `.` sends cell values.
pub trait OutputSink {
    fn write_value(&mut self, value: u64) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads one byte per `,` from any [`Read`] (usually stdin).
pub struct ReaderInput<R: Read> {
    inner: R,
}

impl<R: Read> ReaderInput<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> InputSource for ReaderInput<R> {
    fn read_value(&mut self) -> io::Result<Option<u64>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0] as u64)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Writes cell values to any [`Write`] (usually stdout).
///
/// 8-bit cells are written as raw bytes. Wider cells are written as the
/// UTF-8 encoding of the code point they hold; values that are not Unicode
/// scalar values come out as U+FFFD.
pub struct WriterOutput<W: Write> {
    inner: W,
    width: CellWidth,
    last: Option<u8>,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(inner: W, width: CellWidth) -> Self {
        Self {
            inner,
            width,
            last: None,
        }
    }

    /// Last byte written, if any. Used to decide whether a trailing newline is needed.
    pub fn last_byte(&self) -> Option<u8> {
        self.last
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> OutputSink for WriterOutput<W> {
    fn write_value(&mut self, value: u64) -> io::Result<()> {
        if self.width == CellWidth::W8 {
            let byte = value as u8;
            self.inner.write_all(&[byte])?;
            self.last = Some(byte);
            return Ok(());
        }

        let ch = u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf).as_bytes();
        self.inner.write_all(encoded)?;
        self.last = encoded.last().copied();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A fixed, pre-loaded input sequence.
#[derive(Debug, Clone, Default)]
pub struct BufferInput {
    values: VecDeque<u64>,
}

impl BufferInput {
    pub fn new<I: IntoIterator<Item = u64>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().map(|&b| b as u64))
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl InputSource for BufferInput {
    fn read_value(&mut self) -> io::Result<Option<u64>> {
        Ok(self.values.pop_front())
    }
}

/// Collects every emitted value.
#[derive(Debug, Clone, Default)]
pub struct BufferOutput {
    values: Vec<u64>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Emitted values truncated to bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.values.iter().map(|&v| v as u8).collect()
    }

    /// Emitted values interpreted as code points.
    pub fn text(&self) -> String {
        self.values
            .iter()
            .map(|&v| {
                u32::try_from(v)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect()
    }
}

impl OutputSink for BufferOutput {
    fn write_value(&mut self, value: u64) -> io::Result<()> {
        self.values.push(value);
        Ok(())
    }
}
