//! Configuration type definitions
//!
//! `PersistedConfig` mirrors the JSON document on disk; `Configuration` is the
//! validated in-memory model the launcher works with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::scripts::ScriptEntry;

// ============================================
// ON-DISK FORMAT
// ============================================

/// The JSON document as written to disk.
///
/// ```json
/// { "python_path": "/usr/bin/python3", "scripts": [ {"name": "a.py", "path": "/x/a.py"} ] }
/// ```
///
/// Missing or mistyped fields fall back to an empty string / empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub python_path: String,
    #[serde(default, deserialize_with = "lenient_scripts")]
    pub scripts: Vec<PersistedScript>,
}

/// One script entry in the JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedScript {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_scripts<'de, D>(deserializer: D) -> Result<Vec<PersistedScript>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// ============================================
// IN-MEMORY MODEL
// ============================================

/// Launcher settings held for the whole session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// May be empty or point at a file that no longer exists
    pub interpreter_path: String,
    pub scripts: Vec<ScriptEntry>,
}

impl Configuration {
    /// Build the in-memory model from the on-disk document.
    ///
    /// - an empty `python_path` resolves to `default_interpreter`
    /// - entries with an empty or non-existent path are dropped
    /// - an empty name falls back to the file name
    /// - duplicate paths keep the first occurrence
    pub fn from_persisted(persisted: PersistedConfig, default_interpreter: &str) -> Self {
        let interpreter_path = if persisted.python_path.is_empty() {
            default_interpreter.to_string()
        } else {
            persisted.python_path
        };

        let mut seen = HashSet::new();
        let mut scripts = Vec::with_capacity(persisted.scripts.len());
        for entry in persisted.scripts {
            if entry.path.is_empty() {
                debug!(name = %entry.name, "Dropping script entry without a path");
                continue;
            }
            let path = PathBuf::from(&entry.path);
            if !path.exists() {
                debug!(path = %path.display(), "Dropping script entry, file no longer exists");
                continue;
            }
            if !seen.insert(path.clone()) {
                debug!(path = %path.display(), "Dropping duplicate script entry");
                continue;
            }
            let name = if entry.name.is_empty() {
                file_name_of(&path)
            } else {
                entry.name
            };
            scripts.push(ScriptEntry::new(name, path));
        }

        Self {
            interpreter_path,
            scripts,
        }
    }

    /// Convert back to the on-disk document
    pub fn to_persisted(&self) -> PersistedConfig {
        PersistedConfig {
            python_path: self.interpreter_path.clone(),
            scripts: self
                .scripts
                .iter()
                .map(|s| PersistedScript {
                    name: s.name.clone(),
                    path: s.path.to_string_lossy().into_owned(),
                })
                .collect(),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
