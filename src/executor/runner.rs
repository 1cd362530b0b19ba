//! Single-child process runner
//!
//! State machine: `Idle -> Starting -> Running -> Idle`. `Starting` only exists
//! inside [`ProcessRunner::start`]; a failed start leaves the runner Idle.
//!
//! Reader threads (stdout, stderr) and a waiter thread only forward events
//! over a channel. Decoding, state changes and sink callbacks all happen on
//! the thread that calls [`ProcessRunner::pump`].

use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, instrument, trace, warn};

use super::output::{spawn_reader, OutputChunk, OutputStream, Utf8Decoder};
use super::process::{kill_tree, resolve_interpreter, spawn_script};
use super::stderr_buffer::StderrTail;
use crate::config::defaults::{
    DRAIN_TIMEOUT, EVENT_CHANNEL_CAPACITY, EXIT_POLL_INTERVAL, PUMP_INTERVAL, STOP_TIMEOUT,
};
use crate::error::{LauncherError, Result};
use crate::logging;

/// Identifies one invocation; events from earlier invocations are ignored
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// Completion report for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub run_id: RunId,
    pub script: PathBuf,
    /// OS exit code, or -1 when the process was terminated by a signal
    pub exit_code: i32,
    /// Abnormal termination as reported by the OS (terminated by a signal)
    pub crashed: bool,
    /// Killed through [`ProcessRunner::stop`]
    pub stopped: bool,
    /// Terminating signal (Unix only)
    pub signal: Option<i32>,
    pub duration: Duration,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        !self.crashed && self.exit_code == 0
    }
}

pub type OutputSink = Box<dyn FnMut(&OutputChunk)>;
pub type ExitSink = Box<dyn FnMut(&ExitReport)>;

pub(crate) enum RunnerEvent {
    Output {
        run_id: RunId,
        stream: OutputStream,
        bytes: Vec<u8>,
    },
    Exited {
        run_id: RunId,
        status: std::result::Result<ExitStatus, String>,
    },
}

struct ActiveRun {
    id: RunId,
    script: PathBuf,
    pid: u32,
    /// Shared with the waiter thread so `stop()` can kill while it polls
    child: Arc<Mutex<Child>>,
    started_at: Instant,
    stopped: bool,
    stdout_decoder: Utf8Decoder,
    stderr_decoder: Utf8Decoder,
    stderr_tail: StderrTail,
}

/// Owns at most one child process and reports its output and exit
pub struct ProcessRunner {
    active: Option<ActiveRun>,
    next_id: RunId,
    events_tx: Sender<RunnerEvent>,
    events_rx: Receiver<RunnerEvent>,
    output_sink: Option<OutputSink>,
    exit_sink: Option<ExitSink>,
    stop_timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        let (events_tx, events_rx) = async_channel::bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            active: None,
            next_id: 1,
            events_tx,
            events_rx,
            output_sink: None,
            exit_sink: None,
            stop_timeout: STOP_TIMEOUT,
        }
    }

    /// Register the callback receiving decoded output, replacing any previous one
    pub fn on_output(&mut self, sink: impl FnMut(&OutputChunk) + 'static) {
        self.output_sink = Some(Box::new(sink));
    }

    /// Register the callback receiving the completion report, replacing any previous one
    pub fn on_exit(&mut self, sink: impl FnMut(&ExitReport) + 'static) {
        self.exit_sink = Some(Box::new(sink));
    }

    pub fn state(&self) -> RunState {
        if self.active.is_some() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn current_script(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.script.as_path())
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.pid)
    }

    /// Start `interpreter <script>`.
    ///
    /// Rejected with `ProcessAlreadyRunning` while a child is running; the
    /// running child is left untouched.
    #[instrument(skip_all, fields(script = %script.display()))]
    pub fn start(&mut self, interpreter: &str, script: &Path) -> Result<RunId> {
        if let Some(active) = &self.active {
            warn!(running = %active.script.display(), "Start rejected, a script is already running");
            return Err(LauncherError::ProcessAlreadyRunning);
        }

        debug!(interpreter = %interpreter, "Starting");
        let interpreter = resolve_interpreter(interpreter)?;
        let mut child = spawn_script(&interpreter, script).inspect_err(|e| {
            logging::log_script_event(script, "start_failed", None, false);
            debug!(error = %e, "Start failed");
        })?;

        let run_id = self.next_id;
        self.next_id += 1;

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(
                stdout,
                run_id,
                OutputStream::Stdout,
                self.events_tx.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(
                stderr,
                run_id,
                OutputStream::Stderr,
                self.events_tx.clone(),
            ));
        }

        let pid = child.id();
        let child = Arc::new(Mutex::new(child));
        spawn_waiter(run_id, Arc::clone(&child), readers, self.events_tx.clone());

        self.active = Some(ActiveRun {
            id: run_id,
            script: script.to_path_buf(),
            pid,
            child,
            started_at: Instant::now(),
            stopped: false,
            stdout_decoder: Utf8Decoder::new(),
            stderr_decoder: Utf8Decoder::new(),
            stderr_tail: StderrTail::default(),
        });

        logging::log_script_event(script, "started", None, true);
        info!(run_id, pid, interpreter = %interpreter.display(), "Script running");
        Ok(run_id)
    }

    /// Hard-kill the running child.
    ///
    /// Returns once the completion report has been delivered, so the runner
    /// is Idle afterwards. A child that already exited on its own is not
    /// signalled and reports its real exit status.
    #[instrument(skip_all)]
    pub fn stop(&mut self) -> Result<()> {
        if self.active.is_none() {
            return Err(LauncherError::NotRunning);
        }

        self.pump();
        let Some(active) = self.active.as_mut() else {
            debug!("Script finished before stop, nothing to kill");
            return Ok(());
        };

        {
            // Holding the lock keeps the waiter from reaping between the check and the kill
            let mut child = active.child.lock();
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(run_id = active.id, %status, "Script already exited, not killing");
                }
                _ => {
                    active.stopped = true;
                    info!(run_id = active.id, pid = active.pid, "Stopping script");
                    kill_tree(&mut child);
                }
            }
        }

        if !self.pump_until_idle(self.stop_timeout) {
            if let Some(active) = self.active.take() {
                error!(
                    run_id = active.id,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "Killed process was not reaped in time"
                );
                self.finish(active, Err("process did not exit after kill".to_string()));
            }
        }
        Ok(())
    }

    /// Deliver every event that is ready without blocking. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Pump until the runner is Idle or `timeout` elapses. Returns true if Idle.
    pub fn pump_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.active.is_none() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(PUMP_INTERVAL);
        }
    }

    fn dispatch(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::Output {
                run_id,
                stream,
                bytes,
            } => {
                let text = match self.active.as_mut() {
                    Some(active) if active.id == run_id => match stream {
                        OutputStream::Stdout => active.stdout_decoder.push(&bytes),
                        OutputStream::Stderr => {
                            let text = active.stderr_decoder.push(&bytes);
                            active.stderr_tail.push_text(&text);
                            text
                        }
                    },
                    _ => {
                        trace!(run_id, "Dropping output from a finished run");
                        return;
                    }
                };
                self.emit_output(run_id, stream, text);
            }
            RunnerEvent::Exited { run_id, status } => {
                if self.current_run() != Some(run_id) {
                    trace!(run_id, "Dropping exit of a finished run");
                    return;
                }
                if let Some(active) = self.active.take() {
                    self.finish(active, status);
                }
            }
        }
    }

    fn emit_output(&mut self, run_id: RunId, stream: OutputStream, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(sink) = self.output_sink.as_mut() {
            sink(&OutputChunk {
                run_id,
                stream,
                text,
            });
        }
    }

    /// Flush decoders, build the report and notify. The runner is already Idle.
    fn finish(&mut self, mut active: ActiveRun, status: std::result::Result<ExitStatus, String>) {
        let stdout_rest = active.stdout_decoder.finish();
        self.emit_output(active.id, OutputStream::Stdout, stdout_rest);
        let stderr_rest = active.stderr_decoder.finish();
        active.stderr_tail.push_text(&stderr_rest);
        self.emit_output(active.id, OutputStream::Stderr, stderr_rest);

        let (exit_code, crashed, signal) = match &status {
            Ok(status) => classify(status, active.stopped),
            Err(e) => {
                warn!(error = %e, "Exit status unavailable");
                (-1, true, None)
            }
        };

        let report = ExitReport {
            run_id: active.id,
            script: active.script,
            exit_code,
            crashed,
            stopped: active.stopped,
            signal,
            duration: active.started_at.elapsed(),
        };

        logging::log_script_event(
            &report.script,
            if report.stopped { "stopped" } else { "exited" },
            Some(report.duration),
            report.success(),
        );
        if !report.success() && !active.stderr_tail.is_empty() {
            debug!(
                run_id = report.run_id,
                stderr_tail = %active.stderr_tail.contents(),
                "Script stderr before failure"
            );
        }
        info!(
            run_id = report.run_id,
            exit_code = report.exit_code,
            crashed = report.crashed,
            "Script finished"
        );

        if let Some(sink) = self.exit_sink.as_mut() {
            sink(&report);
        }
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            let mut child = active.child.lock();
            if matches!(child.try_wait(), Ok(None)) {
                debug!(pid = active.pid, "Runner dropped with a live child, killing it");
                kill_tree(&mut child);
            }
        }
    }
}

/// Wait for the child to exit, give the readers a moment to drain, then
/// report the exit. Readers send before the exit event, so output always
/// arrives first.
fn spawn_waiter(
    run_id: RunId,
    child: Arc<Mutex<Child>>,
    readers: Vec<JoinHandle<()>>,
    events: Sender<RunnerEvent>,
) {
    thread::spawn(move || {
        let status = loop {
            let polled = child.lock().try_wait();
            match polled {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    kill_tree(&mut child.lock());
                    break Err(e.to_string());
                }
            }
        };

        // A grandchild may hold the pipes open after the child exits
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while !readers.iter().all(JoinHandle::is_finished) && Instant::now() < deadline {
            thread::sleep(EXIT_POLL_INTERVAL);
        }
        let mut all_drained = true;
        for reader in readers {
            if reader.is_finished() {
                let _ = reader.join();
            } else {
                all_drained = false;
            }
        }
        if !all_drained {
            warn!(run_id, "Output pipes still open after exit, reporting without them");
        }

        if events
            .send_blocking(RunnerEvent::Exited { run_id, status })
            .is_err()
        {
            debug!(run_id, "Runner gone before exit could be reported");
        }
    });
}

fn classify(status: &ExitStatus, stopped: bool) -> (i32, bool, Option<i32>) {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    let code = status.code();
    (code.unwrap_or(-1), code.is_none() || killed_without_signal(stopped), signal)
}

/// Unix reports a kill through the signal; elsewhere a killed child still
/// has an exit code, so a stop is what marks it as crashed.
#[cfg(unix)]
fn killed_without_signal(_stopped: bool) -> bool {
    false
}

#[cfg(not(unix))]
fn killed_without_signal(stopped: bool) -> bool {
    stopped
}
