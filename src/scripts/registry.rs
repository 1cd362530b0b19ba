//! Ordered, duplicate-free list of script shortcuts
//!
//! Insertion order is display order. No two entries share a path.
//! The registry also tracks the current selection, which is always either
//! `None` or a valid index.

use std::path::Path;

use tracing::debug;

use super::types::ScriptEntry;
use crate::error::{LauncherError, Result};

#[derive(Debug, Default, Clone)]
pub struct ScriptRegistry {
    entries: Vec<ScriptEntry>,
    selected: Option<usize>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from entries, skipping duplicate paths
    pub fn from_entries(entries: impl IntoIterator<Item = ScriptEntry>) -> Self {
        let mut registry = Self::new();
        registry.extend_unique(entries);
        registry
    }

    /// Append an entry. Fails if the path is already present.
    pub fn add(&mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        if self.contains_path(path) {
            return Err(LauncherError::DuplicateScript {
                path: path.to_path_buf(),
            });
        }
        self.entries.push(ScriptEntry::new(name, path));
        debug!(path = %path.display(), len = self.entries.len(), "Script added");
        Ok(self.entries.len() - 1)
    }

    /// Append an entry named after its file
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let entry = ScriptEntry::from_path(path.as_ref());
        self.add(entry.name, entry.path)
    }

    /// Append every entry whose path is not already present. Returns how many were added.
    pub fn extend_unique(&mut self, entries: impl IntoIterator<Item = ScriptEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.add(entry.name, &entry.path).is_ok() {
                added += 1;
            }
        }
        added
    }

    /// Remove the entry at `index`, shifting later entries up.
    ///
    /// Removing the selected entry clears the selection; removing an entry
    /// before it keeps the selection on the same script.
    pub fn remove(&mut self, index: usize) -> Result<ScriptEntry> {
        self.check_index(index)?;
        let removed = self.entries.remove(index);
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        debug!(path = %removed.path.display(), len = self.entries.len(), "Script removed");
        Ok(removed)
    }

    /// Change the display name at `index`. The path and position stay the same.
    pub fn rename(&mut self, index: usize, new_name: impl Into<String>) -> Result<()> {
        self.check_index(index)?;
        let new_name = new_name.into();
        if new_name.trim().is_empty() {
            return Err(LauncherError::EmptyName);
        }
        self.entries[index].name = new_name;
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&ScriptEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&ScriptEntry> {
        self.entries.get(index)
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.position_of(path).is_some()
    }

    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(LauncherError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}
