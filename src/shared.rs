//! Shared output state: the single sink, the running-status byte every
//! worker reads and writes, and the two locks that give SysEx atomicity
//! while letting real-time bytes cut in front of ordinary messages.

use std::sync::Mutex;

use crate::error::{Error, FramingReason, Result};
use crate::io::ByteSink;
use crate::message::{self, EOX, SYSEX_START};

/// Output state shared by every [`crate::worker`] thread.
///
/// `sink` is wrapped in its own mutex purely so a single byte write is
/// memory-safe to call from two threads at once; it carries no protocol
/// semantics and is held only for the duration of one `write_byte` call.
/// `msg_lock` is the protocol-level lock: it guards `global_status` *and*
/// is held for the full duration of a non-real-time message, which is what
/// makes that message's bytes contiguous on the wire. `rt_lock` serializes
/// real-time bytes against each other and, additionally held alongside
/// `msg_lock` during SysEx, excludes them from a SysEx transfer.
pub struct SharedOutputState<K> {
    sink: Mutex<K>,
    msg_lock: Mutex<u8>,
    rt_lock: Mutex<()>,
}

impl<K: ByteSink> SharedOutputState<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink: Mutex::new(sink),
            msg_lock: Mutex::new(0x00),
            rt_lock: Mutex::new(()),
        }
    }

    fn write_byte(&self, byte: u8) -> Result<()> {
        self.sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .write_byte(byte)
    }

    /// Write a single System Real-Time byte. Never touches `global_status`
    /// and never waits on `msg_lock`, so a real-time-only producer never
    /// waits for someone else's full message to finish.
    pub fn emit_realtime(&self, byte: u8) -> Result<()> {
        debug_assert!(message::is_realtime(byte));
        let _rt = self.rt_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.write_byte(byte)
    }

    /// Write one complete non-real-time message under `msg_lock`.
    ///
    /// `status` is the message's status byte (the worker's own "intended"
    /// status for this message). `first` is either `status` itself, when the
    /// caller just read a fresh status byte, or a data byte, meaning the
    /// caller is continuing via running status. `data_len` is the total
    /// number of data bytes the message class requires. `next_byte` pulls
    /// further bytes from the calling worker's own source; it is called
    /// with `msg_lock` held, so it must not block on anything but that
    /// worker's own input.
    pub fn emit_message(
        &self,
        status: u8,
        first: u8,
        data_len: u8,
        mut next_byte: impl FnMut() -> Result<u8>,
    ) -> Result<()> {
        debug_assert!(message::is_status_byte(status));
        let mut global_status = self.msg_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut remaining = data_len;

        if first == status {
            if *global_status != status {
                self.write_byte(status)?;
            }
        } else {
            if *global_status != status {
                self.write_byte(status)?;
            }
            self.write_byte(first)?;
            remaining = remaining.saturating_sub(1);
        }

        while remaining > 0 {
            let b = next_byte()?;
            if message::is_realtime(b) {
                // Real-time bytes may appear inside an ordinary message;
                // pass them through without consuming a data-byte slot.
                // Safe to write without `rt_lock`: this worker still holds
                // `msg_lock`, so no other worker can be mid-message right
                // now, and a concurrent real-time-only worker only ever
                // touches the sink through its own momentary lock.
                self.write_byte(b)?;
                continue;
            }
            if message::is_status_byte(b) {
                return Err(Error::from(FramingReason::UnexpectedStatus(b)));
            }
            self.write_byte(b)?;
            remaining -= 1;
        }

        *global_status = status;
        Ok(())
    }

    /// Write an atomic SysEx transfer: `0xF0 .. 0xF7`, with both locks held
    /// for the duration so nothing else appears on the wire in between.
    pub fn emit_sysex(&self, mut next_byte: impl FnMut() -> Result<u8>) -> Result<()> {
        let mut global_status = self.msg_lock.lock().unwrap_or_else(|p| p.into_inner());
        let _rt = self.rt_lock.lock().unwrap_or_else(|p| p.into_inner());

        self.write_byte(SYSEX_START)?;
        loop {
            let b = next_byte()?;
            self.write_byte(b)?;
            if b == EOX {
                break;
            }
        }
        *global_status = 0x00;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// A `ByteSink` over a shared buffer, so tests can inspect what was
    /// written after handing the sink into `SharedOutputState`.
    #[derive(Clone)]
    struct RecordingSink(Arc<Mutex<Vec<u8>>>);

    impl ByteSink for RecordingSink {
        fn write_byte(&mut self, byte: u8) -> Result<()> {
            self.0.lock().unwrap().push(byte);
            Ok(())
        }
    }

    fn bytes(sink: &RecordingSink) -> Vec<u8> {
        sink.0.lock().unwrap().clone()
    }

    #[test]
    fn first_message_emits_status_then_data() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut data = [0x3c, 0x7f].into_iter();
        state
            .emit_message(0x90, 0x90, 2, || Ok(data.next().unwrap()))
            .unwrap();
        assert_eq!(bytes(&sink), vec![0x90, 0x3c, 0x7f]);
    }

    #[test]
    fn running_status_continuation_omits_status_byte() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut first = [0x3c, 0x7f].into_iter();
        state
            .emit_message(0x90, 0x90, 2, || Ok(first.next().unwrap()))
            .unwrap();
        // Second Note On, sent as running status: first relevant byte is a
        // data byte, and global_status already matches 0x90.
        let mut second = [0x00].into_iter();
        state
            .emit_message(0x90, 0x40, 2, || Ok(second.next().unwrap()))
            .unwrap();
        assert_eq!(bytes(&sink), vec![0x90, 0x3c, 0x7f, 0x40, 0x00]);
    }

    #[test]
    fn status_change_re_emits_status_byte() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut a = [0x3c, 0x7f].into_iter();
        state
            .emit_message(0x90, 0x90, 2, || Ok(a.next().unwrap()))
            .unwrap();
        let mut b = [0x3c, 0x40].into_iter();
        state
            .emit_message(0x80, 0x80, 2, || Ok(b.next().unwrap()))
            .unwrap();
        assert_eq!(bytes(&sink), vec![0x90, 0x3c, 0x7f, 0x80, 0x3c, 0x40]);
    }

    #[test]
    fn realtime_byte_inside_message_does_not_consume_a_data_slot() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut rest = [0x07, 0xf8, 0x64].into_iter();
        state
            .emit_message(0xb0, 0xb0, 2, || Ok(rest.next().unwrap()))
            .unwrap();
        assert_eq!(bytes(&sink), vec![0xb0, 0x07, 0xf8, 0x64]);
    }

    #[test]
    fn realtime_never_touches_global_status() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        state.emit_realtime(0xf8).unwrap();
        // global_status stays 0x00, so the next message must still emit
        // its status byte explicitly even though it's the "first" message
        // this worker has sent.
        let mut data = [0x3c, 0x7f].into_iter();
        state
            .emit_message(0x90, 0x90, 2, || Ok(data.next().unwrap()))
            .unwrap();
        assert_eq!(bytes(&sink), vec![0xf8, 0x90, 0x3c, 0x7f]);
    }

    #[test]
    fn sysex_is_written_atomically_and_clears_global_status() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut first = [0x3c, 0x7f].into_iter();
        state
            .emit_message(0x90, 0x90, 2, || Ok(first.next().unwrap()))
            .unwrap();
        let mut sysex = [0x7e, 0x00, 0x06, 0x01, 0xf7].into_iter();
        state.emit_sysex(|| Ok(sysex.next().unwrap())).unwrap();
        assert_eq!(
            bytes(&sink),
            vec![0x90, 0x3c, 0x7f, 0xf0, 0x7e, 0x00, 0x06, 0x01, 0xf7]
        );
        // global_status was cleared, so a running-status continuation of
        // 0x90 must now re-emit the status byte.
        let mut second = [0x50].into_iter();
        state
            .emit_message(0x90, 0x41, 2, || Ok(second.next().unwrap()))
            .unwrap();
        assert_eq!(
            bytes(&sink)[9..],
            [0x90, 0x41, 0x50]
        );
    }

    #[test]
    fn unexpected_status_mid_message_is_a_framing_error() {
        let sink = RecordingSink(Arc::new(Mutex::new(Vec::new())));
        let state = SharedOutputState::new(sink.clone());
        let mut bad = [0x80].into_iter();
        let err = state
            .emit_message(0x90, 0x90, 2, || Ok(bad.next().unwrap()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingReason::UnexpectedStatus(0x80))
        ));
    }
}
