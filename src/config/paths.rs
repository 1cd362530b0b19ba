//! Platform-dependent locations, resolved once at startup.
//!
//! | | bundled scripts | embedded interpreter |
//! |---|---|---|
//! | macOS | `<exe>/../Resources/scripts` | `<exe>/../Resources/python/bin/python3` |
//! | Windows | `<exe>/scripts` | `<exe>/python/python.exe` |
//! | other | `<exe>/scripts` | `<exe>/python/bin/python3` |

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::defaults::{
    APP_DIR_NAME, BUNDLED_SCRIPTS_DIR, CONFIG_FILE_NAME, PATH_INTERPRETER_CANDIDATES,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// JSON config document
    pub config_file: PathBuf,
    /// Directory scanned for scripts when the persisted list is empty
    pub scripts_dir: PathBuf,
    /// Interpreter shipped with the application, may not exist
    pub embedded_interpreter: PathBuf,
}

impl AppPaths {
    /// Resolve paths relative to the running executable and the per-user data dir
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR_NAME));

        let paths = Self::from_dirs(&exe_dir, &data_dir);
        info!(
            config_file = %paths.config_file.display(),
            scripts_dir = %paths.scripts_dir.display(),
            embedded_interpreter = %paths.embedded_interpreter.display(),
            "Resolved application paths"
        );
        paths
    }

    /// Lay out paths for an executable directory and an application data directory
    pub fn from_dirs(exe_dir: &Path, data_dir: &Path) -> Self {
        let resource_dir = resource_dir(exe_dir);
        Self {
            config_file: data_dir.join(CONFIG_FILE_NAME),
            scripts_dir: resource_dir.join(BUNDLED_SCRIPTS_DIR),
            embedded_interpreter: embedded_interpreter(&resource_dir),
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self
    }

    pub fn with_scripts_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scripts_dir = path.into();
        self
    }

    /// Interpreter used when the config does not name one.
    ///
    /// Prefers the embedded interpreter, then `python3`/`python` on PATH.
    /// Returns an empty string when nothing is found.
    pub fn default_interpreter(&self) -> String {
        if self.embedded_interpreter.is_file() {
            debug!(path = %self.embedded_interpreter.display(), "Using embedded interpreter");
            return self.embedded_interpreter.to_string_lossy().into_owned();
        }
        for candidate in PATH_INTERPRETER_CANDIDATES {
            if let Ok(found) = which::which(candidate) {
                debug!(path = %found.display(), "Using interpreter from PATH");
                return found.to_string_lossy().into_owned();
            }
        }
        debug!("No default interpreter found");
        String::new()
    }
}

#[cfg(target_os = "macos")]
fn resource_dir(exe_dir: &Path) -> PathBuf {
    exe_dir.join("..").join("Resources")
}

#[cfg(not(target_os = "macos"))]
fn resource_dir(exe_dir: &Path) -> PathBuf {
    exe_dir.to_path_buf()
}

#[cfg(windows)]
fn embedded_interpreter(resource_dir: &Path) -> PathBuf {
    resource_dir.join("python").join("python.exe")
}

#[cfg(not(windows))]
fn embedded_interpreter(resource_dir: &Path) -> PathBuf {
    resource_dir.join("python").join("bin").join("python3")
}
