//! Runs the `tollgate` binary against a terminal that never answers.
//!
//! The child's stdin stays open for the whole run, so a prompt that times
//! out leaves its read outstanding. The process must still exit with the
//! verdict's status instead of waiting for input that never comes.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Far longer than the 1s deadline used below; reaching it means the
/// process hung.
const HANG_LIMIT: Duration = Duration::from_secs(15);

fn tollgate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tollgate"))
}

fn write_config(dir: &Path, on_timeout: &str) -> PathBuf {
    let path = dir.join("tollgate.toml");
    std::fs::write(
        &path,
        format!("[approval]\nconfirmation_deadline_secs = 1\non_timeout = \"{on_timeout}\"\n"),
    )
    .unwrap();
    path
}

fn spawn(home: &Path, args: &[&str]) -> Child {
    let mut cmd = Command::new(tollgate_bin());
    cmd.args(args)
        .env_clear()
        .env("HOME", home)
        .env("TOLLGATE_HOME", home)
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd.spawn().unwrap()
}

/// Wait for `child` with the hang limit; kills it and fails on a hang.
/// Returns the exit code, stdout and the elapsed time.
fn wait_bounded(mut child: Child) -> (Option<i32>, String, Duration) {
    // Held open until the child exits, like an idle terminal.
    let stdin = child.stdin.take();
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait().unwrap() {
            drop(stdin);
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                let _ = out.read_to_string(&mut stdout);
            }
            return (status.code(), stdout, start.elapsed());
        }
        if start.elapsed() >= HANG_LIMIT {
            let _ = child.kill();
            let _ = child.wait();
            panic!("tollgate still running after {HANG_LIMIT:?}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_auto_approved_timeout_exits_while_stdin_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "approve");
    let config = config.to_str().unwrap();

    let child = spawn(
        dir.path(),
        &[
            "--config", config, "evaluate", "--name", "delete_file", "--format", "json",
        ],
    );
    let (code, stdout, elapsed) = wait_bounded(child);

    assert_eq!(code, Some(0), "stdout: {stdout}");
    assert!(stdout.contains("auto_approved_on_timeout"), "stdout: {stdout}");
    assert!(elapsed >= Duration::from_secs(1));
}

#[test]
fn test_auto_approved_check_exits_while_stdin_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "approve");
    let config = config.to_str().unwrap();
    let calls = dir.path().join("calls.json");
    std::fs::write(
        &calls,
        r#"[{"id": "1", "name": "list_users"}, {"id": "2", "name": "delete_file"}]"#,
    )
    .unwrap();

    let child = spawn(
        dir.path(),
        &["--config", config, "check", calls.to_str().unwrap()],
    );
    let (code, stdout, _) = wait_bounded(child);

    assert_eq!(code, Some(0), "stdout: {stdout}");
}

#[test]
fn test_timed_out_denial_exits_with_denied_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "deny");
    let config = config.to_str().unwrap();

    let child = spawn(
        dir.path(),
        &[
            "--config", config, "evaluate", "--name", "delete_file", "--format", "json",
        ],
    );
    let (code, stdout, _) = wait_bounded(child);

    assert_eq!(code, Some(2), "stdout: {stdout}");
    assert!(stdout.contains("timed_out"), "stdout: {stdout}");
}
