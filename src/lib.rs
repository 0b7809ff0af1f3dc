//! Merges multiple concurrent MIDI 1.0 byte streams into one well-formed
//! output stream.
//!
//! [`worker::run`] is the framing loop that turns one input's raw bytes
//! into messages; [`shared::SharedOutputState`] is the locked sink every
//! worker writes through; [`supervisor::run`] fans workers out and
//! aggregates their results. [`io`] defines the blocking byte source/sink
//! contract the whole crate depends on, and [`message`] is the pure
//! status-byte lookup table both the worker and its tests consult.

pub mod error;
pub mod io;
pub mod message;
pub mod shared;
pub mod supervisor;
pub mod worker;

pub use error::{Error, FramingReason, Result};
pub use io::{ByteSink, ByteSource, FileByteSink, FileByteSource};
pub use shared::SharedOutputState;
pub use supervisor::{Input, MergeError, StreamOutcome, MAX_STREAMS};
pub use worker::StreamId;
