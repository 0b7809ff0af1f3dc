//! The framing loop that turns one input's raw bytes into well-formed
//! messages on the shared sink.

use crate::error::{Error, FramingReason, Result};
use crate::io::ByteSource;
use crate::message::{self, SYSEX_START};
use crate::shared::SharedOutputState;

/// Identity of one input stream, for logging and for the Supervisor's
/// aggregated report. Not a thread id, just a stable index/name pair
/// assigned at startup.
#[derive(Debug, Clone)]
pub struct StreamId {
    pub id: usize,
    pub name: String,
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} ({})", self.id, self.name)
    }
}

/// Read from `source` until end-of-input or an error, emitting every
/// complete message it frames onto `shared`.
///
/// This is the whole per-input framing loop: one byte at a time, classify,
/// then either hand a single real-time byte straight to `shared`, or drive
/// a full message (ordinary or SysEx) through `shared`'s locked emit
/// procedures while pulling any further bytes this message needs from
/// `source` itself.
pub fn run<S: ByteSource, K: crate::io::ByteSink>(
    source: &mut S,
    shared: &SharedOutputState<K>,
) -> Result<()> {
    // The worker's own remembered status and the data-byte count that
    // status requires, tracked explicitly so a running-status continuation
    // always knows how many bytes remain, rather than inheriting a stale
    // count from whatever the previous message needed.
    let mut status: u8 = 0x00;
    let mut expected_len: u8 = 0;

    loop {
        let b = match source.read_byte()? {
            Some(b) => b,
            None => return Ok(()),
        };

        if message::is_realtime(b) {
            shared.emit_realtime(b)?;
            continue;
        }

        if b == SYSEX_START {
            shared.emit_sysex(|| read_mid_message(source))?;
            status = 0x00;
            continue;
        }

        if message::is_system_common(b) {
            let n = message::system_common_data_len(b);
            shared.emit_message(b, b, n, || read_mid_message(source))?;
            status = b;
            expected_len = n;
            continue;
        }

        if message::is_channel_status(b) {
            let n = message::channel_data_len(b);
            shared.emit_message(b, b, n, || read_mid_message(source))?;
            status = b;
            expected_len = n;
            continue;
        }

        debug_assert!(message::is_data_byte(b));
        if status == 0x00 {
            return Err(Error::from(FramingReason::NoRunningStatus(b)));
        }
        shared.emit_message(status, b, expected_len, || read_mid_message(source))?;
    }
}

/// Read one more byte while in the middle of a message or SysEx transfer.
/// Clean end-of-input here is itself a framing violation: a message that
/// started cannot simply stop partway through.
fn read_mid_message<S: ByteSource>(source: &mut S) -> Result<u8> {
    match source.read_byte()? {
        Some(b) => Ok(b),
        None => Err(Error::from(FramingReason::TruncatedMessage)),
    }
}
