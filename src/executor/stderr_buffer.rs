//! Bounded tail of recent stderr lines for post-mortem diagnostics
//!
//! When a run ends with a non-zero code or a crash, the runner logs the
//! last lines the script wrote to stderr. Lives on the control thread, so no
//! locking is needed.

use std::collections::VecDeque;

use crate::config::defaults::{STDERR_TAIL_MAX_BYTES, STDERR_TAIL_MAX_LINES};

#[derive(Debug, Clone)]
pub struct StderrTail {
    /// Complete lines (newest at back)
    lines: VecDeque<String>,
    /// Text after the last newline
    partial: String,
    max_lines: usize,
    max_bytes: usize,
    current_bytes: usize,
}

impl Default for StderrTail {
    fn default() -> Self {
        Self::new(STDERR_TAIL_MAX_LINES, STDERR_TAIL_MAX_BYTES)
    }
}

impl StderrTail {
    pub fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(1024)),
            partial: String::new(),
            max_lines,
            max_bytes,
            current_bytes: 0,
        }
    }

    /// Append decoded stderr text, splitting it into lines
    pub fn push_text(&mut self, text: &str) {
        let mut rest = text;
        while let Some(pos) = rest.find('\n') {
            self.partial.push_str(&rest[..pos]);
            let line = std::mem::take(&mut self.partial);
            self.push_line(line.trim_end_matches('\r').to_string());
            rest = &rest[pos + 1..];
        }
        self.partial.push_str(rest);
    }

    fn push_line(&mut self, line: String) {
        let line_bytes = line.len();

        // Evict old lines if we're over the byte limit
        while self.current_bytes + line_bytes > self.max_bytes && !self.lines.is_empty() {
            if let Some(old) = self.lines.pop_front() {
                self.current_bytes = self.current_bytes.saturating_sub(old.len());
            }
        }

        // Evict old lines if we're over the line limit
        while self.lines.len() >= self.max_lines {
            if let Some(old) = self.lines.pop_front() {
                self.current_bytes = self.current_bytes.saturating_sub(old.len());
            }
        }

        self.current_bytes += line_bytes;
        self.lines.push_back(line);
    }

    /// Buffered lines, including an unterminated last line, joined with `\n`
    pub fn contents(&self) -> String {
        let mut out: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        if !self.partial.is_empty() {
            out.push(&self.partial);
        }
        out.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }
}
