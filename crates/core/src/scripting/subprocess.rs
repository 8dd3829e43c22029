//! Spawn, capture and time-box a child process.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};

/// Per-stream capture limit (1 MiB).
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Run a fully configured `cmd` under the limits in `input`.
///
/// The child is killed when the timeout elapses (`kill_on_drop`). A
/// non-zero exit is returned as output, not as an error; see
/// [`ScriptOutput::ensure_success`].
pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }
    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScriptError::NotFound(e.to_string()),
        std::io::ErrorKind::PermissionDenied => ScriptError::PermissionDenied(e.to_string()),
        _ => ScriptError::Io(e),
    })?;

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    match tokio::time::timeout(input.timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok(ScriptOutput {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Ok(Err(e)) => Err(ScriptError::Io(e)),
        Err(_elapsed) => Err(ScriptError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(stream) = handle {
        let _ = stream.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn input() -> ScriptInput {
        ScriptInput::with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");
        let output = run_command(&mut cmd, input()).await.expect("run");
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn passes_env_and_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf '%s' \"$KITFORGE_TEST\" > marker.txt");
        let input = input().env("KITFORGE_TEST", "hello").in_dir(dir.path());
        let output = run_command(&mut cmd, input).await.expect("run");
        assert_eq!(output.exit_code, 0);
        let written = std::fs::read_to_string(dir.path().join("marker.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn times_out() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let result = run_command(&mut cmd, ScriptInput::with_timeout(Duration::from_millis(100))).await;
        assert_matches!(result, Err(ScriptError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program() {
        let mut cmd = Command::new("/nonexistent/kitforge-tool");
        let result = run_command(&mut cmd, input()).await;
        assert_matches!(result, Err(ScriptError::NotFound(_)));
    }
}
