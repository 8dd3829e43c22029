//! Script execution interface shared by the bridge and its tests.
//!
//! [`ScriptExecutor`] is the seam between the job processor and the design
//! tool. The production implementation is
//! [`DesignerExecutor`](super::designer::DesignerExecutor); tests substitute
//! in-memory fakes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to run one script.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    pub env_vars: Vec<(String, String)>,
    /// Directory the tool starts in; relative paths it writes land here.
    pub working_directory: Option<PathBuf>,
    /// Wall-clock limit; the child is killed when it elapses.
    pub timeout: Duration,
}

impl ScriptInput {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            env_vars: Vec::new(),
            working_directory: None,
            timeout,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ScriptOutput {
    /// Turn a non-zero exit into [`ScriptError::ExecutionFailed`].
    pub fn ensure_success(self) -> Result<Self, ScriptError> {
        if self.exit_code == 0 {
            Ok(self)
        } else {
            Err(ScriptError::ExecutionFailed {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Script timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Script failed with exit code {exit_code}: {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest stderr excerpt kept in a failure diagnostic.
const DIAGNOSTIC_LIMIT: usize = 2000;

impl ScriptError {
    /// One-line diagnostic suitable for a job's `error_message`.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::ExecutionFailed { exit_code, stderr } => {
                let stderr = stderr.trim();
                let excerpt: String = stderr.chars().take(DIAGNOSTIC_LIMIT).collect();
                if excerpt.is_empty() {
                    format!("Design tool exited with code {exit_code}")
                } else {
                    format!("Design tool exited with code {exit_code}: {excerpt}")
                }
            }
            other => other.to_string(),
        }
    }
}

/// Runs a script file with the given input.
pub trait ScriptExecutor: Send + Sync {
    fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn output(exit_code: i32, stderr: &str) -> ScriptOutput {
        ScriptOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code,
            duration_ms: 1,
        }
    }

    #[test]
    fn zero_exit_is_success() {
        assert!(output(0, "warning").ensure_success().is_ok());
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        assert_matches!(
            output(3, "no document").ensure_success(),
            Err(ScriptError::ExecutionFailed { exit_code: 3, ref stderr }) if stderr == "no document"
        );
    }

    #[test]
    fn diagnostics() {
        let err = ScriptError::ExecutionFailed {
            exit_code: 2,
            stderr: "  boom \n".into(),
        };
        assert_eq!(err.diagnostic(), "Design tool exited with code 2: boom");

        let err = ScriptError::ExecutionFailed {
            exit_code: 1,
            stderr: String::new(),
        };
        assert_eq!(err.diagnostic(), "Design tool exited with code 1");

        let err = ScriptError::Timeout { elapsed_ms: 5000 };
        assert_eq!(err.diagnostic(), "Script timed out after 5000ms");
    }

    #[test]
    fn input_builder() {
        let input = ScriptInput::with_timeout(Duration::from_secs(1)).env("A", "b");
        assert_eq!(input.env_vars, vec![("A".to_string(), "b".to_string())]);
        assert_eq!(input.working_directory, None);

        let input = input.in_dir("/tmp/job-1");
        assert_eq!(input.working_directory, Some(PathBuf::from("/tmp/job-1")));
    }
}
