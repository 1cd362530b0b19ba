//! Loading and saving the config document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use super::types::{Configuration, PersistedConfig};
use crate::error::{ConfigIoError, LauncherError, Result};

/// Reads and writes the launcher configuration at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration.
    ///
    /// A missing file yields an empty configuration using `default_interpreter`.
    /// Unreadable or malformed files are a `ConfigRead` error.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self, default_interpreter: &str) -> Result<Configuration> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config file not found, using defaults");
                return Ok(Configuration::from_persisted(
                    PersistedConfig::default(),
                    default_interpreter,
                ));
            }
            Err(e) => return Err(self.read_error(e.into())),
        };

        let persisted: PersistedConfig =
            serde_json::from_str(&content).map_err(|e| self.read_error(e.into()))?;
        let config = Configuration::from_persisted(persisted, default_interpreter);
        info!(
            scripts = config.scripts.len(),
            interpreter = %config.interpreter_path,
            "Loaded config"
        );
        Ok(config)
    }

    /// Load the configuration, falling back to defaults on a read error.
    ///
    /// The error is handed back so the caller can show it to the user.
    pub fn load_or_default(
        &self,
        default_interpreter: &str,
    ) -> (Configuration, Option<LauncherError>) {
        match self.load(default_interpreter) {
            Ok(config) => (config, None),
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                let config =
                    Configuration::from_persisted(PersistedConfig::default(), default_interpreter);
                (config, Some(e))
            }
        }
    }

    /// Replace the config file with `config`.
    ///
    /// Writes to a temporary sibling and renames it over the target.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, config: &Configuration) -> Result<()> {
        let json = serde_json::to_string_pretty(&config.to_persisted())
            .map_err(|e| self.write_error(e.into()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e.into()))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| self.write_error(e.into()))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.write_error(e.into()));
        }

        info!(scripts = config.scripts.len(), "Saved config");
        Ok(())
    }

    fn read_error(&self, source: ConfigIoError) -> LauncherError {
        LauncherError::ConfigRead {
            path: self.path.clone(),
            source,
        }
    }

    fn write_error(&self, source: ConfigIoError) -> LauncherError {
        LauncherError::ConfigWrite {
            path: self.path.clone(),
            source,
        }
    }
}
