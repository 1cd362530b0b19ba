//! Default configuration values
//!
//! All constants used throughout the launcher are defined here.

use std::time::Duration;

/// Directory name under the per-user data directories
pub const APP_DIR_NAME: &str = "script-deck";

/// Config file name inside the application data directory
pub const CONFIG_FILE_NAME: &str = "python_runner_config.json";

/// JSONL log file name
pub const LOG_FILE_NAME: &str = "script-deck.jsonl";

/// Bundled scripts directory name, next to the executable (or in Resources on macOS)
pub const BUNDLED_SCRIPTS_DIR: &str = "scripts";

/// Extension recognised when scanning for scripts (compared case-insensitively)
pub const SCRIPT_EXTENSION: &str = "py";

/// Executables tried on PATH when no embedded interpreter is bundled
pub const PATH_INTERPRETER_CANDIDATES: &[&str] = &["python3", "python"];

/// How long `stop()` waits for the killed child to be reaped
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Waiter thread poll interval while a child is running
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long the waiter lets readers drain after the child exits.
///
/// A background grandchild can keep the pipes open past the child's exit;
/// output it writes after this cutoff is not delivered.
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Control loop tick used by the binary and blocking helpers
pub const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer size for stdout/stderr reader threads
pub const READ_CHUNK_SIZE: usize = 4096;

/// Capacity of the runner event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Stderr tail kept for diagnostics when a run fails
pub const STDERR_TAIL_MAX_LINES: usize = 50;
pub const STDERR_TAIL_MAX_BYTES: usize = 4 * 1024;
