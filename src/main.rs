use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use async_channel::TryRecvError;
use clap::Parser;
use tracing::{error, info, warn};

use script_deck::commands::{self, CommandOutcome, ExternalCommand};
use script_deck::config::defaults::PUMP_INTERVAL;
use script_deck::config::AppPaths;
use script_deck::console::ConsoleEvent;
use script_deck::error::{ErrorSeverity, LauncherError, ResultExt};
use script_deck::launcher::Launcher;
use script_deck::logging;

/// Headless launcher driven by JSONL commands on stdin
#[derive(Debug, Parser)]
#[command(name = "script-deck", version, about)]
struct Args {
    /// Config file to load and save instead of the per-user default
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory scanned for scripts when the saved list is empty
    #[arg(long, value_name = "DIR")]
    scripts_dir: Option<PathBuf>,

    /// Interpreter to use instead of the saved one
    #[arg(long, value_name = "FILE")]
    interpreter: Option<String>,

    /// Do not write the config on exit
    #[arg(long)]
    no_save: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = logging::init();

    let mut paths = AppPaths::detect();
    if let Some(config) = args.config {
        paths = paths.with_config_file(config);
    }
    if let Some(dir) = args.scripts_dir {
        if !dir.is_dir() {
            bail!("scripts directory does not exist: {}", dir.display());
        }
        let dir = std::path::absolute(&dir)
            .with_context(|| format!("failed to resolve {}", dir.display()))?;
        paths = paths.with_scripts_dir(dir);
    }

    let (mut launcher, startup_errors) = Launcher::bootstrap(&paths, args.interpreter);
    for err in &startup_errors {
        notify(err);
    }

    launcher.console().borrow_mut().set_listener(|event| match event {
        ConsoleEvent::Cleared => {}
        ConsoleEvent::Appended { text, .. } => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|_| stdout.flush())
                .log_err();
        }
    });
    print_view(&launcher);

    let commands = commands::start_stdin_listener();
    let mut input_closed = false;

    loop {
        launcher.pump();

        if input_closed {
            if !launcher.is_running() {
                info!("stdin closed and nothing running, exiting");
                break;
            }
        } else {
            match commands.try_recv() {
                Ok(command) => {
                    if dispatch(&mut launcher, command) == CommandOutcome::Quit {
                        break;
                    }
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    info!("stdin closed");
                    input_closed = true;
                }
            }
        }

        std::thread::sleep(PUMP_INTERVAL);
    }

    if let Err(err) = launcher.shutdown(!args.no_save) {
        notify(&err);
    }
    info!(event_type = "app_lifecycle", action = "stopped", "Launcher exiting");
    Ok(())
}

fn dispatch(launcher: &mut Launcher, command: ExternalCommand) -> CommandOutcome {
    let show_view = !matches!(command, ExternalCommand::Quit);
    let outcome = match commands::handle_command(launcher, command) {
        Ok(outcome) => outcome,
        Err(err) => {
            notify(&err);
            CommandOutcome::Continue
        }
    };
    if show_view {
        print_view(launcher);
    }
    outcome
}

/// Show an error the way a dialog would, and log it
fn notify(err: &LauncherError) {
    match err.severity() {
        ErrorSeverity::Error => error!(error = %err, "Operation failed"),
        ErrorSeverity::Warning => warn!(error = %err, "Operation rejected"),
        ErrorSeverity::Info => info!(error = %err, "Operation skipped"),
    }
    eprintln!("! {}", err.user_message());
}

fn print_view(launcher: &Launcher) {
    if let Some(json) = serde_json::to_string(&launcher.view()).log_err() {
        eprintln!("{}", json);
    }
}
