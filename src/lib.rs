//! Script Deck - a launcher for Python scripts
//!
//! Keeps a list of script shortcuts, runs the chosen one with a configurable
//! interpreter, streams its output into a console model and persists the
//! interpreter path and list between sessions.

pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod logging;
pub mod scripts;
