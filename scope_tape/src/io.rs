// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte I/O for `,` and `.`.
//!
//! The VM delegates its only effects to an embedder-provided [`ByteSource`] and [`ByteSink`].
//! Byte slices and `Vec<u8>` implement them directly; with the `std` feature, [`Reader`] and
//! [`Writer`] adapt any [`std::io::Read`] / [`std::io::Write`].

use alloc::vec::Vec;
use core::fmt;

/// Errors a byte source or sink can return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoError {
    /// The stream was closed by the other side (e.g. a broken pipe or a zero-length write).
    Closed,
    /// The stream failed for any other reason.
    Failed,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "stream closed"),
            Self::Failed => write!(f, "stream failed"),
        }
    }
}

impl core::error::Error for IoError {}

/// Where `,` reads from.
pub trait ByteSource {
    /// Reads one byte. `Ok(None)` signals end of input.
    ///
    /// May block.
    fn read_byte(&mut self) -> Result<Option<u8>, IoError>;
}

/// Where `.` writes to.
pub trait ByteSink {
    /// Writes one byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError>;

    /// Flushes buffered output. Called once when a run completes.
    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        (**self).read_byte()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> Result<(), IoError> {
        (**self).flush()
    }
}

impl ByteSource for &[u8] {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        let Some((&b, rest)) = self.split_first() else {
            return Ok(None);
        };
        *self = rest;
        Ok(Some(b))
    }
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<(), IoError> {
        self.push(byte);
        Ok(())
    }
}

/// A source that is always at end of input.
#[derive(Copy, Clone, Debug, Default)]
pub struct Empty;

impl ByteSource for Empty {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        Ok(None)
    }
}

/// A sink that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct Discard;

impl ByteSink for Discard {
    fn write_byte(&mut self, _byte: u8) -> Result<(), IoError> {
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use std_io::{Reader, Writer};

#[cfg(feature = "std")]
mod std_io {
    use std::io::{ErrorKind, Read, Write};

    use super::{ByteSink, ByteSource, IoError};

    fn map_err(e: &std::io::Error) -> IoError {
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::WriteZero | ErrorKind::UnexpectedEof => {
                IoError::Closed
            }
            _ => IoError::Failed,
        }
    }

    /// Adapts a [`Read`] into a [`ByteSource`].
    ///
    /// Reads are unbuffered; wrap the reader in a [`std::io::BufReader`] when that matters.
    #[derive(Debug)]
    pub struct Reader<R>(pub R);

    impl<R: Read> ByteSource for Reader<R> {
        fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
            let mut buf = [0_u8; 1];
            loop {
                match self.0.read(&mut buf) {
                    Ok(0) => return Ok(None),
                    Ok(_) => return Ok(Some(buf[0])),
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => return Err(map_err(&e)),
                }
            }
        }
    }

    /// Adapts a [`Write`] into a [`ByteSink`].
    #[derive(Debug)]
    pub struct Writer<W>(pub W);

    impl<W: Write> ByteSink for Writer<W> {
        fn write_byte(&mut self, byte: u8) -> Result<(), IoError> {
            self.0.write_all(&[byte]).map_err(|e| map_err(&e))
        }

        fn flush(&mut self) -> Result<(), IoError> {
            self.0.flush().map_err(|e| map_err(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reads_then_reports_end() {
        let mut src: &[u8] = b"ab";
        assert_eq!(src.read_byte(), Ok(Some(b'a')));
        assert_eq!(src.read_byte(), Ok(Some(b'b')));
        assert_eq!(src.read_byte(), Ok(None));
        assert_eq!(src.read_byte(), Ok(None));
    }

    #[test]
    fn vec_sink_collects_bytes() {
        let mut out = Vec::new();
        out.write_byte(1).unwrap();
        out.write_byte(2).unwrap();
        ByteSink::flush(&mut out).unwrap();
        assert_eq!(out, [1, 2]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_adapters_round_trip_through_cursor() {
        let mut r = Reader(std::io::Cursor::new(b"x".to_vec()));
        assert_eq!(r.read_byte(), Ok(Some(b'x')));
        assert_eq!(r.read_byte(), Ok(None));

        let mut w = Writer(Vec::new());
        w.write_byte(b'y').unwrap();
        w.flush().unwrap();
        assert_eq!(w.0, b"y");
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_writer_maps_write_zero_to_closed() {
        let mut buf = [0_u8; 0];
        let mut w = Writer(&mut buf[..]);
        assert_eq!(w.write_byte(1), Err(IoError::Closed));
    }
}
