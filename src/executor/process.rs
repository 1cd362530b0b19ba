//! Child process spawning and hard termination

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, error, info};

use crate::error::StartFailure;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

// Unix-specific process control using libc
#[cfg(unix)]
mod unix_process {
    use libc::{c_int, pid_t};

    /// Send a signal to a process group (negative PID targets the group)
    pub fn kill_process_group(pgid: u32, signal: c_int) -> Result<(), &'static str> {
        // Safety: kill() is a simple syscall with no memory safety concerns
        let rc = unsafe { libc::kill(-(pgid as pid_t), signal) };
        if rc == 0 {
            Ok(())
        } else {
            let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            match errno {
                libc::ESRCH => Err("No such process group"),
                libc::EPERM => Err("Permission denied"),
                libc::EINVAL => Err("Invalid signal"),
                _ => Err("Unknown error"),
            }
        }
    }

    pub const SIGKILL: c_int = libc::SIGKILL;
}

/// Expand `~` and check that `interpreter` is an existing executable file
pub fn resolve_interpreter(interpreter: &str) -> Result<PathBuf, StartFailure> {
    let trimmed = interpreter.trim();
    if trimmed.is_empty() {
        return Err(StartFailure::InterpreterNotSet);
    }
    let path = PathBuf::from(shellexpand::tilde(trimmed).as_ref());

    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(_) => return Err(StartFailure::InterpreterMissing(path)),
    };
    if !metadata.is_file() || !is_executable(&metadata) {
        return Err(StartFailure::InterpreterNotExecutable(path));
    }
    Ok(path)
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// Spawn `interpreter <script>` with stdout/stderr piped and stdin closed.
///
/// On Unix the child leads a new process group so [`kill_tree`] reaches
/// anything it spawns.
pub fn spawn_script(interpreter: &Path, script: &Path) -> Result<Child, StartFailure> {
    if !script.is_file() {
        return Err(StartFailure::ScriptMissing(script.to_path_buf()));
    }

    debug!(
        interpreter = %interpreter.display(),
        script = %script.display(),
        "Spawning script process"
    );

    let mut command = Command::new(interpreter);
    command
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // process_group(0) means the child's PID becomes the PGID
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(|e| {
        error!(error = %e, interpreter = %interpreter.display(), "Process spawn failed");
        StartFailure::Spawn {
            interpreter: interpreter.to_path_buf(),
            source: e,
        }
    })?;

    info!(pid = child.id(), script = %script.display(), "Process spawned");
    Ok(child)
}

/// Hard-kill the child (and on Unix its whole process group). No grace period.
pub fn kill_tree(child: &mut Child) {
    let pid = child.id();

    #[cfg(unix)]
    {
        use unix_process::{kill_process_group, SIGKILL};

        match kill_process_group(pid, SIGKILL) {
            Ok(()) => debug!(pgid = pid, "SIGKILL sent to process group"),
            Err("No such process group") => debug!(pgid = pid, "Process group already exited"),
            Err(e) => debug!(pgid = pid, error = e, "SIGKILL to process group failed"),
        }
    }

    // Reaches the leader on every platform, and is a no-op if it already exited
    if let Err(e) = child.kill() {
        debug!(pid = pid, error = %e, "Child::kill failed");
    }
}
