//! Fans out one thread per input, waits for all of them, and aggregates
//! their terminal statuses into a single process-level result.
//!
//! The Supervisor is control-plane only: it never touches a MIDI byte
//! itself, it only starts [`crate::worker::run`] on its own thread per
//! input and reports what came back.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::error::Error;
use crate::io::{ByteSink, ByteSource};
use crate::shared::SharedOutputState;
use crate::worker::{self, StreamId};

/// Recommended maximum number of concurrent input streams. Enforced here as
/// a backstop even though the CLI front end is expected to enforce it
/// before opening any file.
pub const MAX_STREAMS: usize = 8;

/// One input's terminal outcome, recorded only when it failed. A clean
/// end-of-input is success and isn't reported as a failure.
#[derive(Debug)]
pub struct StreamOutcome {
    pub stream: StreamId,
    pub error: Error,
}

/// The Supervisor's aggregated result: every input that did not terminate
/// cleanly, in the order its thread was reaped.
#[derive(Debug)]
pub enum MergeError {
    /// No input streams were provided; the sink is never opened for
    /// writing and no worker is started.
    NoInputs,
    /// More input streams were requested than `MAX_STREAMS` allows.
    TooManyStreams(usize),
    /// One or more input streams terminated with an error.
    StreamFailures(Vec<StreamOutcome>),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::NoInputs => write!(f, "no input streams were provided"),
            MergeError::TooManyStreams(n) => {
                write!(f, "{n} input streams requested, maximum is {MAX_STREAMS}")
            }
            MergeError::StreamFailures(outcomes) => {
                writeln!(f, "{} input stream(s) failed:", outcomes.len())?;
                for outcome in outcomes {
                    writeln!(f, "  {}: {}", outcome.stream, outcome.error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MergeError {}

/// Signaled once by each worker thread on exit; lets the Supervisor block
/// on a condition variable instead of polling with a bounded sleep.
struct Completion {
    done: Mutex<Vec<bool>>,
    cv: Condvar,
}

impl Completion {
    fn new(n: usize) -> Self {
        Self {
            done: Mutex::new(vec![false; n]),
            cv: Condvar::new(),
        }
    }

    fn mark_done(&self, index: usize) {
        let mut done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        done[index] = true;
        self.cv.notify_all();
    }

    fn wait_all(&self) {
        let done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        let _guard = self
            .cv
            .wait_while(done, |done| !done.iter().all(|&d| d))
            .unwrap_or_else(|p| p.into_inner());
    }
}

/// One named input, paired with the byte source that feeds it.
pub struct Input {
    pub stream: StreamId,
    pub source: Box<dyn ByteSource + Send>,
}

/// Construct the shared output state around `sink`, start one worker per
/// entry in `inputs`, wait for all of them, and aggregate their terminal
/// statuses into a single result.
pub fn run(
    inputs: Vec<Input>,
    sink: Box<dyn ByteSink + Send>,
) -> std::result::Result<(), MergeError> {
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }
    if inputs.len() > MAX_STREAMS {
        return Err(MergeError::TooManyStreams(inputs.len()));
    }

    let shared = Arc::new(SharedOutputState::new(sink));
    let completion = Arc::new(Completion::new(inputs.len()));
    let mut handles = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let shared = Arc::clone(&shared);
        let completion = Arc::clone(&completion);
        let mut source = input.source;
        let stream = input.stream;
        let thread_name = stream.name.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                log::info!("stream {stream} starting");
                let result = worker::run(&mut source, shared.as_ref());
                match &result {
                    Ok(()) => log::info!("stream {stream} finished"),
                    Err(e) => log::error!("stream {stream} failed: {e}"),
                }
                // Signal completion before returning so the Supervisor's
                // wait can never race ahead of the thread actually being
                // joinable: `done[index]` transitions false -> true here,
                // exactly once, only from this worker's own thread.
                completion.mark_done(index);
                (stream, result)
            })
            .expect("failed to spawn stream worker thread");
        handles.push(handle);
    }

    completion.wait_all();

    // Every worker has signaled `done`; joining here cannot block, it only
    // reaps each thread exactly once and recovers its outcome.
    let mut failures = Vec::new();
    for handle in handles {
        let (stream, result) = handle.join().expect("stream worker thread panicked");
        if let Err(error) = result {
            failures.push(StreamOutcome { stream, error });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(MergeError::StreamFailures(failures))
    }
}
