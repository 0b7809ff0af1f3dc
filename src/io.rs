//! Blocking byte source / sink abstractions.
//!
//! The core depends on nothing more than "read one byte" and "write one
//! byte". `FileByteSource`/`FileByteSink` adapt any `std::io::Read`/`Write`
//! (regular files, pipes, stdin/stdout, and, transparently since they're
//! opened as ordinary files, OS MIDI character devices) to that contract.

use std::io::{ErrorKind, Read, Write};

use crate::error::{Error, Result};

/// A blocking source of MIDI bytes. `Ok(None)` means clean end-of-input,
/// which is not an error.
pub trait ByteSource {
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

/// A blocking sink for MIDI bytes. Partial writes are not observable here:
/// a single byte is either fully written or the call fails.
pub trait ByteSink {
    fn write_byte(&mut self, byte: u8) -> Result<()>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Box<T> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }
}

/// Adapts any `Read` into a `ByteSource`.
pub struct FileByteSource<R> {
    inner: R,
}

impl<R: Read> FileByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> ByteSource for FileByteSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::IoRead(e)),
            }
        }
    }
}

/// Adapts any `Write` into a `ByteSink`.
pub struct FileByteSink<W> {
    inner: W,
}

impl<W: Write> FileByteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> ByteSink for FileByteSink<W> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        loop {
            match self.inner.write(&[byte]) {
                // A completed one-byte write is the only success case; any
                // other count (notably 0) is treated as a write failure
                // rather than silently retried.
                Ok(1) => return self.inner.flush().map_err(Error::IoWrite),
                Ok(_) => {
                    return Err(Error::IoWrite(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "short write",
                    )))
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::IoWrite(e)),
            }
        }
    }
}
