//! Script execution module
//!
//! This module handles all aspects of running a script:
//! - Interpreter validation and process spawning
//! - Incremental stdout/stderr capture and decoding
//! - The single-child `ProcessRunner` state machine
//! - Stderr tail kept for failure diagnostics

mod output;
mod process;
mod runner;
mod stderr_buffer;

pub use output::{OutputChunk, OutputStream, Utf8Decoder};
pub use process::resolve_interpreter;
pub use runner::{ExitReport, ExitSink, OutputSink, ProcessRunner, RunId, RunState};
pub use stderr_buffer::StderrTail;

#[cfg(test)]
#[path = "../executor_tests.rs"]
mod tests;
