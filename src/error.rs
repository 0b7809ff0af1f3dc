//! Error vocabulary for the merging core.
//!
//! The core never prints or logs; it only returns these values. The binary
//! (see `main.rs`) is responsible for turning them into diagnostics.

use std::io;

use thiserror::Error;

/// One input/output operation failed, or the stream ended cleanly.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-EOF failure reading from an input source.
    #[error("read error: {0}")]
    IoRead(#[source] io::Error),

    /// Failure writing to the shared sink. Treated as fatal for the worker
    /// that observed it, and likely fatal for the whole run.
    #[error("write error: {0}")]
    IoWrite(#[source] io::Error),

    /// Malformed MIDI: a status byte where a data byte was expected, or a
    /// data byte at top-of-loop with no status established yet.
    #[error("framing error: {0}")]
    Framing(#[from] FramingReason),
}

/// The specific way a stream violated MIDI 1.0 framing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingReason {
    /// A data byte arrived before any status byte had been seen on this
    /// stream, so there is no running status to continue.
    #[error("data byte {0:#04x} with no established status")]
    NoRunningStatus(u8),

    /// A status byte arrived in the middle of a message that expected more
    /// data bytes.
    #[error("status byte {0:#04x} interrupted an in-progress message")]
    UnexpectedStatus(u8),

    /// The input ended while a message (ordinary or SysEx) was still
    /// incomplete.
    #[error("input ended in the middle of a message")]
    TruncatedMessage,
}

pub type Result<T> = std::result::Result<T, Error>;
