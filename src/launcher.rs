//! Launcher controller and read model
//!
//! Connects the script registry, the process runner and the config store,
//! and owns the output console. A presentation layer calls the operations
//! here and renders [`LauncherView`]; it never touches the components
//! directly.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{AppPaths, ConfigStore, Configuration};
use crate::console::{Console, ConsoleKind};
use crate::error::{LauncherError, Result};
use crate::executor::{resolve_interpreter, ProcessRunner, RunId, RunState};
use crate::scripts::{load_defaults, ScriptEntry, ScriptRegistry};

/// Appearance state of one script tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileState {
    Normal,
    Selected,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub index: usize,
    pub name: String,
    /// Full path, shown as the tooltip
    pub path: String,
    pub state: TileState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsView {
    pub can_add: bool,
    pub can_remove: bool,
    pub can_run: bool,
    pub can_stop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterView {
    pub label: String,
    pub tooltip: String,
}

/// Everything a presentation layer needs to draw the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherView {
    pub tiles: Vec<TileView>,
    pub run_state: RunState,
    pub actions: ActionsView,
    pub interpreter: InterpreterView,
}

pub struct Launcher {
    registry: ScriptRegistry,
    runner: ProcessRunner,
    store: ConfigStore,
    interpreter_path: String,
    console: Rc<RefCell<Console>>,
}

impl Launcher {
    /// Assemble a launcher from an already loaded configuration
    pub fn new(store: ConfigStore, config: Configuration) -> Self {
        let console = Rc::new(RefCell::new(Console::new()));
        let mut runner = ProcessRunner::new();

        let output_console = Rc::clone(&console);
        runner.on_output(move |chunk| {
            output_console
                .borrow_mut()
                .append(ConsoleKind::from(chunk.stream), &chunk.text);
        });
        let exit_console = Rc::clone(&console);
        runner.on_exit(move |report| {
            exit_console.borrow_mut().record_exit(report);
        });

        Self {
            registry: ScriptRegistry::from_entries(config.scripts),
            runner,
            store,
            interpreter_path: config.interpreter_path,
            console,
        }
    }

    /// Load the persisted configuration, seed from the bundled scripts
    /// directory when the list is empty, and apply an interpreter override.
    ///
    /// Recoverable problems are returned alongside the launcher so the caller
    /// can show them.
    #[instrument(skip_all)]
    pub fn bootstrap(
        paths: &AppPaths,
        interpreter_override: Option<String>,
    ) -> (Self, Vec<LauncherError>) {
        let store = ConfigStore::new(&paths.config_file);
        let (mut config, load_error) = store.load_or_default(&paths.default_interpreter());
        if let Some(interpreter) = interpreter_override {
            config.interpreter_path = interpreter;
        }

        let mut launcher = Self::new(store, config);
        if launcher.registry.is_empty() {
            let added = launcher
                .registry
                .extend_unique(load_defaults(&paths.scripts_dir));
            info!(
                count = added,
                dir = %paths.scripts_dir.display(),
                "Seeded script list from bundled scripts"
            );
        }

        (launcher, load_error.into_iter().collect())
    }

    // ------------------------------------------------------------------
    // Script list
    // ------------------------------------------------------------------

    /// Add a script named after its file
    pub fn add_script(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        self.registry.add_path(absolute(path.as_ref()))
    }

    pub fn add_script_named(&mut self, name: &str, path: impl AsRef<Path>) -> Result<usize> {
        self.registry.add(name, absolute(path.as_ref()))
    }

    pub fn remove(&mut self, index: usize) -> Result<ScriptEntry> {
        self.registry.remove(index)
    }

    /// Remove the selected script; nothing happens without a selection
    pub fn remove_selected(&mut self) -> Result<Option<ScriptEntry>> {
        match self.registry.selected() {
            Some(index) => self.registry.remove(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<()> {
        self.registry.rename(index, name)
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        self.registry.select(index)
    }

    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Interpreter
    // ------------------------------------------------------------------

    pub fn set_interpreter(&mut self, path: impl Into<String>) {
        self.interpreter_path = path.into();
        info!(interpreter = %self.interpreter_path, "Interpreter changed");
    }

    pub fn interpreter_path(&self) -> &str {
        &self.interpreter_path
    }

    // ------------------------------------------------------------------
    // Running
    // ------------------------------------------------------------------

    /// Select `index` and run it unless something is already running
    pub fn activate(&mut self, index: usize) -> Result<Option<RunId>> {
        self.registry.select(index)?;
        if self.runner.is_running() {
            debug!(index, "Activate while running, selection only");
            return Ok(None);
        }
        self.run(index).map(Some)
    }

    pub fn run_selected(&mut self) -> Result<RunId> {
        let index = self.registry.selected().ok_or(LauncherError::NoSelection)?;
        self.run(index)
    }

    /// Run the script at `index` with the configured interpreter.
    ///
    /// The console is cleared only once the interpreter checks out.
    #[instrument(skip(self))]
    pub fn run(&mut self, index: usize) -> Result<RunId> {
        if self.runner.is_running() {
            return Err(LauncherError::ProcessAlreadyRunning);
        }
        let script = self
            .registry
            .get(index)
            .map(|e| e.path.clone())
            .ok_or(LauncherError::IndexOutOfRange {
                index,
                len: self.registry.len(),
            })?;
        resolve_interpreter(&self.interpreter_path)?;

        {
            let mut console = self.console.borrow_mut();
            console.clear();
            console.banner(&format!("--- Running: {} ---\n", script.display()));
            console.banner(&format!("--- Interpreter: {} ---\n", self.interpreter_path));
        }

        match self.runner.start(&self.interpreter_path, &script) {
            Ok(run_id) => Ok(run_id),
            Err(e) => {
                self.console.borrow_mut().banner(&format!(
                    "\n--- ERROR: could not start process: {} ---\n",
                    self.interpreter_path
                ));
                Err(e)
            }
        }
    }

    /// Kill the running script. One that already finished just reports its exit.
    pub fn stop(&mut self) -> Result<()> {
        if !self.runner.is_running() {
            return Err(LauncherError::NotRunning);
        }
        self.runner.pump();
        if self.runner.is_running() {
            info!(pid = ?self.runner.current_pid(), "Stop requested");
            self.console
                .borrow_mut()
                .banner("\n--- Process stopped by user. ---\n");
        }
        self.runner.stop()
    }

    /// Deliver pending process output and completion to the console
    pub fn pump(&mut self) -> usize {
        self.runner.pump()
    }

    pub fn pump_until_idle(&mut self, timeout: std::time::Duration) -> bool {
        self.runner.pump_until_idle(timeout)
    }

    pub fn run_state(&self) -> RunState {
        self.runner.state()
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    pub fn console(&self) -> Rc<RefCell<Console>> {
        Rc::clone(&self.console)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn configuration(&self) -> Configuration {
        Configuration {
            interpreter_path: self.interpreter_path.clone(),
            scripts: self.registry.entries().to_vec(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.configuration())
    }

    /// Kill a running child, then persist unless `persist` is false
    #[instrument(skip(self))]
    pub fn shutdown(&mut self, persist: bool) -> Result<()> {
        if self.runner.is_running() {
            warn!("Shutting down with a running script, killing it");
            self.stop()?;
        }
        if persist {
            self.save()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read model
    // ------------------------------------------------------------------

    pub fn view(&self) -> LauncherView {
        let selected = self.registry.selected();
        let running_script = self.runner.current_script();
        let is_running = self.runner.is_running();

        let tiles = self
            .registry
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let state = if running_script == Some(entry.path.as_path()) {
                    TileState::Running
                } else if selected == Some(index) {
                    TileState::Selected
                } else {
                    TileState::Normal
                };
                TileView {
                    index,
                    name: entry.name.clone(),
                    path: entry.path.to_string_lossy().into_owned(),
                    state,
                }
            })
            .collect();

        LauncherView {
            tiles,
            run_state: self.runner.state(),
            actions: ActionsView {
                can_add: true,
                can_remove: selected.is_some(),
                can_run: selected.is_some() && !is_running,
                can_stop: is_running,
            },
            interpreter: self.interpreter_view(),
        }
    }

    fn interpreter_view(&self) -> InterpreterView {
        if self.interpreter_path.is_empty() {
            return InterpreterView {
                label: "Not found".to_string(),
                tooltip: "No embedded Python interpreter found. Select one manually.".to_string(),
            };
        }
        let label = Path::new(&self.interpreter_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.interpreter_path.clone());
        InterpreterView {
            label,
            tooltip: self.interpreter_path.clone(),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
