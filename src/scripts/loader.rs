//! Script discovery from the file system
//!
//! Used on first run to seed the registry from the bundled `scripts` directory.

use std::path::Path;
use tracing::{debug, instrument, warn};

use super::types::ScriptEntry;
use crate::config::defaults::SCRIPT_EXTENSION;

/// Scan `directory` (non-recursively) for `.py` files.
///
/// Entries are sorted by file name so the initial order does not depend on
/// the platform's directory enumeration. Paths are absolute.
/// Returns an empty vec if the directory doesn't exist or can't be read.
#[instrument(level = "debug", skip_all, fields(dir = %directory.display()))]
pub fn load_defaults(directory: &Path) -> Vec<ScriptEntry> {
    let directory = match std::path::absolute(directory) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "Failed to resolve scripts directory");
            return vec![];
        }
    };

    let entries = match std::fs::read_dir(&directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "Scripts directory not readable, nothing to seed");
            return vec![];
        }
    };

    let mut scripts: Vec<ScriptEntry> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_script_file(path))
        .map(ScriptEntry::from_path)
        .collect();

    scripts.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(count = scripts.len(), "Found scripts");
    scripts
}

/// Check if the path has the script extension (case-insensitive)
pub fn is_script_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
        .unwrap_or(false)
}
