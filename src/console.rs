//! Output panel model
//!
//! Holds the text the presentation layer shows under the script grid: run
//! banners plus everything the child writes. A listener sees each change as
//! it happens so a front end can render live.

use crate::executor::{ExitReport, OutputStream};

/// Upper bound on retained panel text; the oldest text is dropped first
const MAX_CONSOLE_BYTES: usize = 1024 * 1024;

/// What kind of text was appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKind {
    /// Status line written by the launcher itself
    Banner,
    Stdout,
    Stderr,
}

impl From<OutputStream> for ConsoleKind {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => ConsoleKind::Stdout,
            OutputStream::Stderr => ConsoleKind::Stderr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEvent<'a> {
    Cleared,
    Appended { kind: ConsoleKind, text: &'a str },
}

pub type ConsoleListener = Box<dyn FnMut(ConsoleEvent<'_>)>;

#[derive(Default)]
pub struct Console {
    text: String,
    last_exit: Option<ExitReport>,
    listener: Option<ConsoleListener>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("bytes", &self.text.len())
            .field("last_exit", &self.last_exit)
            .finish()
    }
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&mut self, listener: impl FnMut(ConsoleEvent<'_>) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear(&mut self) {
        self.text.clear();
        if let Some(listener) = self.listener.as_mut() {
            listener(ConsoleEvent::Cleared);
        }
    }

    pub fn append(&mut self, kind: ConsoleKind, text: &str) {
        if text.is_empty() {
            return;
        }
        self.text.push_str(text);
        self.trim_front();
        if let Some(listener) = self.listener.as_mut() {
            listener(ConsoleEvent::Appended { kind, text });
        }
    }

    pub fn banner(&mut self, text: &str) {
        self.append(ConsoleKind::Banner, text);
    }

    /// Record a finished run and append its status line
    pub fn record_exit(&mut self, report: &ExitReport) {
        let status = if report.crashed {
            "crashed"
        } else {
            "finished normally"
        };
        self.banner(&format!(
            "\n--- Process {} (exit code: {}) ---\n",
            status, report.exit_code
        ));
        self.last_exit = Some(report.clone());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_exit(&self) -> Option<&ExitReport> {
        self.last_exit.as_ref()
    }

    fn trim_front(&mut self) {
        if self.text.len() <= MAX_CONSOLE_BYTES {
            return;
        }
        let mut cut = self.text.len() - MAX_CONSOLE_BYTES;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        self.text.drain(..cut);
    }
}
