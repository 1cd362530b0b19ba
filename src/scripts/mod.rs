//! Scripts module - the list of launchable script shortcuts
//!
//! This module provides functionality for:
//! - The `ScriptEntry` type (display name + absolute path)
//! - The ordered, duplicate-free `ScriptRegistry` with selection tracking
//! - Seeding the registry from a bundled scripts directory
//!
//! # Module Structure
//!
//! - `types` - Core data types
//! - `registry` - Ordered registry with add/remove/rename
//! - `loader` - Directory scan for script files

mod loader;
mod registry;
mod types;

pub use loader::{is_script_file, load_defaults};
pub use registry::ScriptRegistry;
pub use types::ScriptEntry;

#[cfg(test)]
#[path = "../scripts_tests.rs"]
mod tests;
