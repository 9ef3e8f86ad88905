//! ProcessExecutor tests against real host processes.

use std::path::Path;
use std::time::{Duration, Instant};

use mesh_commander::executor::{ExecOptions, Executor, ExecutorError, ProcessExecutor};

fn opts(timeout: Duration) -> ExecOptions {
    ExecOptions { timeout }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

#[tokio::test]
async fn captures_stdout_with_positional_args() {
    let result = ProcessExecutor::new()
        .execute(
            Path::new("echo"),
            &args(&["hello", "Alice Smith"]),
            opts(Duration::from_secs(10)),
        )
        .await
        .expect("echo should run");
    assert_eq!(result.stdout, "hello Alice Smith\n");
    assert!(result.success());
}

#[tokio::test]
async fn captures_stderr_and_nonzero_exit() {
    let result = ProcessExecutor::new()
        .execute(
            Path::new("sh"),
            &args(&["-c", "echo out; echo err >&2; exit 4"]),
            opts(Duration::from_secs(10)),
        )
        .await
        .expect("sh should run");
    assert_eq!(result.exit_code, Some(4));
    assert_eq!(result.output(), "out\n\nerr\n");
}

#[tokio::test]
async fn script_file_receives_arguments() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let script = dir.path().join("greet.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"hi $1 and $2\"\n").expect("should write");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("should chmod");
    }

    let result = ProcessExecutor::new()
        .execute(&script, &args(&["hello", "world"]), opts(Duration::from_secs(10)))
        .await
        .expect("script should run");
    assert_eq!(result.stdout.trim(), "hi hello and world");
}

#[tokio::test]
async fn slow_process_is_killed_at_timeout() {
    let started = Instant::now();
    let result = ProcessExecutor::new()
        .execute(
            Path::new("sleep"),
            &args(&["30"]),
            opts(Duration::from_millis(200)),
        )
        .await;
    assert!(matches!(result, Err(ExecutorError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_executable_is_a_launch_error() {
    let result = ProcessExecutor::new()
        .execute(
            Path::new("/nonexistent/mesh-action"),
            &[],
            opts(Duration::from_secs(5)),
        )
        .await;
    match result {
        Err(ExecutorError::Launch(message)) => {
            assert!(message.contains("/nonexistent/mesh-action"), "got: {message}");
        }
        other => panic!("expected launch error, got {other:?}"),
    }
}
