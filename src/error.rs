use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

/// Error severity for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,    // informational, nothing went wrong
    Warning, // recoverable, user may want to act
    Error,   // operation failed
}

/// Why a process could not be started
#[derive(Error, Debug)]
pub enum StartFailure {
    #[error("no interpreter configured")]
    InterpreterNotSet,

    #[error("interpreter not found at {}", .0.display())]
    InterpreterMissing(PathBuf),

    #[error("interpreter at {} is not an executable file", .0.display())]
    InterpreterNotExecutable(PathBuf),

    #[error("script not found at {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("failed to spawn {}: {source}", .interpreter.display())]
    Spawn {
        interpreter: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Domain-specific errors for the launcher
#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Script already in the list: {}", .path.display())]
    DuplicateScript { path: PathBuf },

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Script name must not be empty")]
    EmptyName,

    #[error("No script selected")]
    NoSelection,

    #[error("Could not start process: {0}")]
    StartProcess(#[from] StartFailure),

    #[error("A script is already running")]
    ProcessAlreadyRunning,

    #[error("No script is running")]
    NotRunning,

    #[error("Failed to read config from '{}': {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: ConfigIoError,
    },

    #[error("Failed to write config to '{}': {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: ConfigIoError,
    },
}

/// Underlying cause of a config read/write failure
#[derive(Error, Debug)]
pub enum ConfigIoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LauncherError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DuplicateScript { .. } => ErrorSeverity::Warning,
            Self::IndexOutOfRange { .. } => ErrorSeverity::Warning,
            Self::EmptyName => ErrorSeverity::Warning,
            Self::NoSelection => ErrorSeverity::Info,
            Self::StartProcess(_) => ErrorSeverity::Error,
            Self::ProcessAlreadyRunning => ErrorSeverity::Info,
            Self::NotRunning => ErrorSeverity::Info,
            Self::ConfigRead { .. } => ErrorSeverity::Warning,
            Self::ConfigWrite { .. } => ErrorSeverity::Error,
        }
    }

    /// Text for the visible notification shown to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::DuplicateScript { .. } => "This script is already in the list.".to_string(),
            Self::IndexOutOfRange { .. } => "No script at that position.".to_string(),
            Self::EmptyName => "The new name cannot be empty.".to_string(),
            Self::NoSelection => "Select a script first.".to_string(),
            Self::StartProcess(StartFailure::InterpreterNotSet)
            | Self::StartProcess(StartFailure::InterpreterMissing(_)) => {
                "Python interpreter not found. Check that it is bundled with the app or select it manually."
                    .to_string()
            }
            Self::StartProcess(reason) => format!("Could not start the script: {}", reason),
            Self::ProcessAlreadyRunning => {
                "A script is already running. Stop it before starting another.".to_string()
            }
            Self::NotRunning => "Nothing is running.".to_string(),
            Self::ConfigRead { path, .. } => format!(
                "Could not read settings from {}, starting with defaults.",
                path.display()
            ),
            Self::ConfigWrite { path, .. } => {
                format!("Could not save settings to {}.", path.display())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use script_deck::error::ResultExt;
///
/// // Log and continue if the registry rejects a seeded entry
/// registry.add(name, path).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
