//! Output capture: reader threads and incremental UTF-8 decoding

use std::io::Read;
use std::thread::{self, JoinHandle};

use async_channel::Sender;
use tracing::debug;

use super::runner::{RunId, RunnerEvent};
use crate::config::defaults::READ_CHUNK_SIZE;

/// Which pipe a chunk of output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Decoded output delivered to the output sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub run_id: RunId,
    pub stream: OutputStream,
    pub text: String,
}

/// Decodes a byte stream as UTF-8 across arbitrary chunk boundaries.
///
/// Incomplete trailing sequences are held until the next chunk; invalid
/// bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end, wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is pending at end of stream
    pub fn finish(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}

/// Spawn a thread that forwards raw chunks from `pipe` until EOF
pub(crate) fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
    run_id: RunId,
    stream: OutputStream,
    events: Sender<RunnerEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let event = RunnerEvent::Output {
                        run_id,
                        stream,
                        bytes: buf[..n].to_vec(),
                    };
                    // send_blocking is used since we're in a sync thread
                    if events.send_blocking(event).is_err() {
                        debug!(stream = stream.as_str(), "Event channel closed, reader exiting");
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(stream = stream.as_str(), error = %e, "Pipe read failed");
                    break;
                }
            }
        }
        debug!(run_id, stream = stream.as_str(), "Reader reached end of stream");
    })
}
