use super::*;
use crate::error::{LauncherError, StartFailure};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Utf8Decoder
// ============================================================================

#[test]
fn test_decoder_passes_ascii_through() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.push(b"hello\n"), "hello\n");
    assert_eq!(decoder.finish(), "");
}

#[test]
fn test_decoder_joins_split_multibyte_chars() {
    let text = "zażółć gęślą";
    let bytes = text.as_bytes();
    // 'ż' is two bytes starting at index 2; split inside it
    let mut decoder = Utf8Decoder::new();
    let first = decoder.push(&bytes[..3]);
    let second = decoder.push(&bytes[3..]);
    assert_eq!(first, "za");
    assert_eq!(format!("{}{}", first, second), text);
}

#[test]
fn test_decoder_replaces_invalid_bytes() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.push(b"a\xffb"), "a\u{FFFD}b");
}

#[test]
fn test_decoder_flushes_truncated_sequence_on_finish() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.push(&[b'x', 0xC5]), "x");
    assert_eq!(decoder.finish(), "\u{FFFD}");
}

// ============================================================================
// ProcessRunner (uses /bin/sh as the interpreter)
// ============================================================================

#[derive(Default)]
struct Recorded {
    stdout: String,
    stderr: String,
    /// "out", "err" and "exit" in delivery order
    sequence: Vec<&'static str>,
    exits: Vec<ExitReport>,
}

fn recording_runner() -> (ProcessRunner, Rc<RefCell<Recorded>>) {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut runner = ProcessRunner::new();

    let out = Rc::clone(&recorded);
    runner.on_output(move |chunk| {
        let mut r = out.borrow_mut();
        match chunk.stream {
            OutputStream::Stdout => {
                r.stdout.push_str(&chunk.text);
                r.sequence.push("out");
            }
            OutputStream::Stderr => {
                r.stderr.push_str(&chunk.text);
                r.sequence.push("err");
            }
        }
    });

    let exit = Rc::clone(&recorded);
    runner.on_exit(move |report| {
        let mut r = exit.borrow_mut();
        r.exits.push(report.clone());
        r.sequence.push("exit");
    });

    (runner, recorded)
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[cfg(unix)]
const SH: &str = "/bin/sh";

#[cfg(unix)]
#[test]
fn test_exit_zero_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "exit 0\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    assert_eq!(runner.state(), RunState::Running);
    assert!(runner.pump_until_idle(WAIT));

    let r = recorded.borrow();
    assert_eq!(r.exits.len(), 1);
    let report = &r.exits[0];
    assert_eq!((report.exit_code, report.crashed), (0, false));
    assert!(!report.stopped);
    assert!(report.success());
    assert_eq!(report.script, script);
    assert_eq!(runner.state(), RunState::Idle);
}

#[cfg(unix)]
#[test]
fn test_nonzero_exit_code_is_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fail.sh", "echo boom >&2\nexit 3\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));

    let r = recorded.borrow();
    assert_eq!(r.exits[0].exit_code, 3);
    assert!(!r.exits[0].crashed);
    assert!(!r.exits[0].success());
    assert_eq!(r.stderr, "boom\n");
}

#[cfg(unix)]
#[test]
fn test_captures_both_streams_before_completion() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "talk.sh",
        "echo out1\necho err1 >&2\necho out2\necho err2 >&2\n",
    );
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));

    let r = recorded.borrow();
    assert_eq!(r.stdout, "out1\nout2\n");
    assert_eq!(r.stderr, "err1\nerr2\n");
    assert_eq!(r.sequence.last(), Some(&"exit"));
    assert_eq!(r.sequence.iter().filter(|s| **s == "exit").count(), 1);
}

#[cfg(unix)]
#[test]
fn test_script_path_is_the_single_argument() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "args.sh", "echo \"$0|$#\"\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));

    assert_eq!(
        recorded.borrow().stdout,
        format!("{}|0\n", script.display())
    );
}

#[cfg(unix)]
#[test]
fn test_output_arrives_before_exit() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "slow.sh", "echo first\nsleep 1\necho second\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();

    let deadline = Instant::now() + WAIT;
    while recorded.borrow().stdout.is_empty() && Instant::now() < deadline {
        runner.pump();
        std::thread::sleep(Duration::from_millis(10));
    }
    // Delivered incrementally while the child is still sleeping
    assert_eq!(recorded.borrow().stdout, "first\n");
    assert!(runner.is_running());

    assert!(runner.pump_until_idle(WAIT));
    assert_eq!(recorded.borrow().stdout, "first\nsecond\n");
}

#[cfg(unix)]
#[test]
fn test_exit_reported_after_drain_cutoff_when_grandchild_holds_pipes() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "bg.sh",
        "(sleep 3; echo late) &\necho early\n",
    );
    let (mut runner, recorded) = recording_runner();

    let started = Instant::now();
    runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));

    assert!(started.elapsed() < Duration::from_secs(3));
    let r = recorded.borrow();
    assert_eq!(r.stdout, "early\n");
    assert_eq!(r.exits.len(), 1);
    assert_eq!(r.exits[0].exit_code, 0);
}

#[cfg(unix)]
#[test]
fn test_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let long = write_script(dir.path(), "long.sh", "sleep 30\n");
    let other = write_script(dir.path(), "other.sh", "exit 0\n");
    let (mut runner, recorded) = recording_runner();

    let first = runner.start(SH, &long).unwrap();
    let pid = runner.current_pid();

    let err = runner.start(SH, &other).unwrap_err();
    assert!(matches!(err, LauncherError::ProcessAlreadyRunning));
    assert_eq!(runner.current_run(), Some(first));
    assert_eq!(runner.current_pid(), pid);
    assert_eq!(runner.current_script(), Some(long.as_path()));

    runner.stop().unwrap();
    assert_eq!(recorded.borrow().exits.len(), 1);
    assert_eq!(recorded.borrow().exits[0].run_id, first);
}

#[cfg(unix)]
#[test]
fn test_stop_kills_and_reports_once() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "long.sh", "echo started\nsleep 30\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    let started = Instant::now();
    runner.stop().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(runner.state(), RunState::Idle);
    {
        let r = recorded.borrow();
        assert_eq!(r.exits.len(), 1);
        let report = &r.exits[0];
        assert!(report.stopped);
        assert!(report.crashed);
        assert_eq!(report.signal, Some(libc::SIGKILL));
        assert_eq!(report.exit_code, -1);
    }

    // Nothing left to deliver for the killed run
    std::thread::sleep(Duration::from_millis(100));
    runner.pump();
    assert_eq!(recorded.borrow().exits.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_stop_after_natural_exit_keeps_real_status() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "quick.sh", "echo done\nexit 0\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    // Child exits and is reaped while nobody pumps
    std::thread::sleep(Duration::from_millis(700));
    runner.stop().unwrap();

    assert_eq!(runner.state(), RunState::Idle);
    let r = recorded.borrow();
    assert_eq!(r.exits.len(), 1);
    let report = &r.exits[0];
    assert_eq!(report.exit_code, 0);
    assert!(!report.crashed);
    assert!(!report.stopped);
    assert_eq!(report.signal, None);
    assert!(report.success());
    assert_eq!(r.stdout, "done\n");
}

#[cfg(unix)]
#[test]
fn test_stop_does_not_kill_exited_child_whose_event_is_pending() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fail.sh", "exit 4\n");
    let (mut runner, recorded) = recording_runner();

    runner.start(SH, &script).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    runner.stop().unwrap();

    let r = recorded.borrow();
    assert_eq!(r.exits.len(), 1);
    assert_eq!((r.exits[0].exit_code, r.exits[0].crashed), (4, false));
    assert!(!r.exits[0].stopped);
}

#[test]
fn test_stop_when_idle_is_an_error() {
    let mut runner = ProcessRunner::new();
    assert!(matches!(runner.stop(), Err(LauncherError::NotRunning)));
}

#[cfg(unix)]
#[test]
fn test_runner_can_start_again_after_exit() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "echo hi\n");
    let (mut runner, recorded) = recording_runner();

    let first = runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));
    let second = runner.start(SH, &script).unwrap();
    assert!(runner.pump_until_idle(WAIT));

    assert_ne!(first, second);
    assert_eq!(recorded.borrow().stdout, "hi\nhi\n");
    assert_eq!(recorded.borrow().exits.len(), 2);
}

#[test]
fn test_start_with_empty_interpreter() {
    let mut runner = ProcessRunner::new();
    let err = runner.start("  ", Path::new("/tmp/x.py")).unwrap_err();
    assert!(matches!(
        err,
        LauncherError::StartProcess(StartFailure::InterpreterNotSet)
    ));
    assert_eq!(runner.state(), RunState::Idle);
}

#[test]
fn test_start_with_missing_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("python3");
    let mut runner = ProcessRunner::new();

    let err = runner
        .start(&missing.to_string_lossy(), Path::new("/tmp/x.py"))
        .unwrap_err();
    assert!(matches!(
        err,
        LauncherError::StartProcess(StartFailure::InterpreterMissing(_))
    ));
    assert!(!runner.is_running());
}

#[cfg(unix)]
#[test]
fn test_start_with_non_executable_interpreter() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let fake = write_script(dir.path(), "python3", "");
    std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o644)).unwrap();

    let err = resolve_interpreter(&fake.to_string_lossy()).unwrap_err();
    assert!(matches!(err, StartFailure::InterpreterNotExecutable(_)));

    let err = resolve_interpreter(&dir.path().to_string_lossy()).unwrap_err();
    assert!(matches!(err, StartFailure::InterpreterNotExecutable(_)));
}

#[cfg(unix)]
#[test]
fn test_start_with_missing_script() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = ProcessRunner::new();

    let err = runner
        .start(SH, &dir.path().join("nope.py"))
        .unwrap_err();
    assert!(matches!(
        err,
        LauncherError::StartProcess(StartFailure::ScriptMissing(_))
    ));
    assert_eq!(runner.state(), RunState::Idle);
}
