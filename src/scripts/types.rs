//! Script entry type

use std::path::{Path, PathBuf};

/// A launchable script shortcut.
///
/// `path` is the identity key; `name` is only what gets displayed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptEntry {
    pub name: String,
    pub path: PathBuf,
}

impl ScriptEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Entry named after the file, as the file picker creates it
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
