//! Executor that hands an automation script to the design tool.
//!
//! On macOS the tool is an application driven through `osascript`; on
//! Windows and everything else it is an executable that takes the script
//! path as its only argument.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesignerExecutor {
    tool: PathBuf,
    platform: Platform,
}

impl DesignerExecutor {
    /// `tool` is the application bundle (or application name) on macOS and
    /// the executable path elsewhere.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// Program and arguments that run `script_path`.
    pub fn invocation(&self, script_path: &str) -> (String, Vec<String>) {
        match self.platform {
            Platform::MacOs => {
                let statement = format!(
                    "tell application \"{}\" to do javascript (POSIX file \"{}\" as alias)",
                    applescript_escape(&self.application_name()),
                    applescript_escape(script_path),
                );
                ("osascript".to_string(), vec!["-e".to_string(), statement])
            }
            Platform::Windows | Platform::Other => (
                self.tool.to_string_lossy().into_owned(),
                vec![script_path.to_string()],
            ),
        }
    }

    /// `/Applications/Adobe Illustrator.app` -> `Adobe Illustrator`; a bare
    /// name is used as is.
    fn application_name(&self) -> String {
        match self.tool.extension() {
            Some(ext) if ext == "app" => self
                .tool
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => self.tool.to_string_lossy().into_owned(),
        }
    }

    /// Verify the tool exists and is executable. Always passes on macOS,
    /// where the application is addressed by name.
    pub async fn check_tool(&self) -> Result<(), ScriptError> {
        if self.platform == Platform::MacOs {
            return Ok(());
        }

        let display = self.tool.display().to_string();
        let metadata = tokio::fs::metadata(&self.tool)
            .await
            .map_err(|_| ScriptError::NotFound(display.clone()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                return Err(ScriptError::PermissionDenied(format!(
                    "{display} is not executable (mode {mode:#o})"
                )));
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        Ok(())
    }
}

impl ScriptExecutor for DesignerExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        self.check_tool().await?;

        let (program, args) = self.invocation(script_path);
        tracing::debug!(%program, script = script_path, "Invoking design tool");

        let mut cmd = Command::new(program);
        cmd.args(args);
        subprocess::run_command(&mut cmd, input).await
    }
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
