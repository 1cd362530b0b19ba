//! Configuration module - persisted launcher settings
//!
//! This module provides functionality for:
//! - Resolving platform-dependent paths once at startup
//! - Loading/saving the JSON config document
//! - Default values for all settings
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions
//! - `paths` - Config file, bundled scripts and embedded interpreter locations
//! - `store` - File system loading and saving

pub mod defaults;
mod paths;
mod store;
mod types;

pub use paths::AppPaths;
pub use store::ConfigStore;
pub use types::{Configuration, PersistedConfig, PersistedScript};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
