//! Design-tool automation: script rendering and subprocess execution.
//!
//! Everything here is free of database and network access so the bridge
//! can be tested with fake executors.

pub mod designer;
pub mod executor;
pub mod subprocess;
pub mod template;

pub use designer::{DesignerExecutor, Platform};
pub use executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
pub use template::{render_automation_script, AutomationAssets, AutomationPayload, TemplateError};

/// Shared test helpers for executor tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::time::Duration;

    use super::executor::ScriptInput;

    /// No env vars, five-second timeout.
    pub fn default_input() -> ScriptInput {
        ScriptInput::with_timeout(Duration::from_secs(5))
    }
}
