//! External command handling via stdin.
//!
//! The headless front end drives the launcher with JSON objects, one per
//! line (JSONL format):
//!
//! ```json
//! {"type": "add", "path": "/path/to/tool.py"}
//! {"type": "activate", "index": 0}
//! {"type": "stop"}
//! {"type": "rename", "index": 0, "name": "Backup"}
//! {"type": "setInterpreter", "path": "/usr/bin/python3"}
//! {"type": "quit"}
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! printf '%s\n' '{"type":"run","index":0}' | ./script-deck --no-save
//! ```

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::defaults::EVENT_CHANNEL_CAPACITY;
use crate::error::Result;
use crate::launcher::Launcher;

/// Commands accepted on stdin
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExternalCommand {
    /// Add a script; the name defaults to the file name
    Add {
        path: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// Remove by index, or the selected script when no index is given
    Remove {
        #[serde(default)]
        index: Option<usize>,
    },
    Select { index: usize },
    /// Select and run unless something is already running
    Activate { index: usize },
    /// Run by index, or the selected script
    Run {
        #[serde(default)]
        index: Option<usize>,
    },
    Stop,
    Rename { index: usize, name: String },
    SetInterpreter { path: String },
    /// Print the current view model
    List,
    Save,
    Quit,
}

/// What the main loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

/// Start a thread that listens on stdin for external JSONL commands.
///
/// The channel is bounded; the reader blocks when the main loop falls
/// behind. When the receiver is dropped the thread exits on the next line.
pub fn start_stdin_listener() -> async_channel::Receiver<ExternalCommand> {
    use std::io::BufRead;

    let (tx, rx) = async_channel::bounded(EVENT_CHANNEL_CAPACITY);

    std::thread::spawn(move || {
        debug!("External command listener started");
        let stdin = std::io::stdin();
        let reader = stdin.lock();

        for line in reader.lines() {
            match line {
                Ok(line) if !line.trim().is_empty() => match parse_command(&line) {
                    Ok(cmd) => {
                        debug!(command = ?cmd, "Parsed command");
                        // send_blocking since we're in a sync thread
                        if tx.send_blocking(cmd).is_err() {
                            debug!("Command channel closed, exiting");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, line = %line, "Failed to parse command");
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Error reading stdin");
                    break;
                }
            }
        }
        debug!("External command listener exiting");
    });

    rx
}

pub fn parse_command(line: &str) -> serde_json::Result<ExternalCommand> {
    serde_json::from_str(line.trim())
}

/// Apply one command to the launcher.
///
/// Errors are returned to the caller for display; they never end the loop.
pub fn handle_command(launcher: &mut Launcher, command: ExternalCommand) -> Result<CommandOutcome> {
    info!(command = ?command, "Handling command");
    match command {
        ExternalCommand::Add { path, name } => {
            match name {
                Some(name) => launcher.add_script_named(&name, &path)?,
                None => launcher.add_script(&path)?,
            };
        }
        ExternalCommand::Remove { index: Some(index) } => {
            launcher.remove(index)?;
        }
        ExternalCommand::Remove { index: None } => {
            launcher.remove_selected()?;
        }
        ExternalCommand::Select { index } => launcher.select(index)?,
        ExternalCommand::Activate { index } => {
            launcher.activate(index)?;
        }
        ExternalCommand::Run { index: Some(index) } => {
            launcher.select(index)?;
            launcher.run(index)?;
        }
        ExternalCommand::Run { index: None } => {
            launcher.run_selected()?;
        }
        ExternalCommand::Stop => launcher.stop()?,
        ExternalCommand::Rename { index, name } => launcher.rename(index, &name)?,
        ExternalCommand::SetInterpreter { path } => launcher.set_interpreter(path),
        ExternalCommand::List => {}
        ExternalCommand::Save => launcher.save()?,
        ExternalCommand::Quit => return Ok(CommandOutcome::Quit),
    }
    Ok(CommandOutcome::Continue)
}

// ============================================================================
// Tests
// ============================================================================
