//! Rendering of the automation script handed to the design tool.
//!
//! The script body is fixed ([`AUTOMATION_TEMPLATE`]); only three
//! placeholders vary per job. Every substituted value lands inside a
//! double-quoted string literal and is escaped for it, so paths and JSON
//! with quotes, backslashes or line separators cannot break out.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::customize::VariantConfiguration;

pub const AUTOMATION_TEMPLATE: &str = include_str!("automation.jsx");

pub const TEMPLATE_PATH: &str = "{{TEMPLATE_PATH}}";
pub const OUTPUT_BASE: &str = "{{OUTPUT_BASE}}";
pub const INSTRUCTIONS_JSON: &str = "{{INSTRUCTIONS_JSON}}";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(TEMPLATE_PATH|OUTPUT_BASE|INSTRUCTIONS_JSON)\}\}").expect("valid regex")
});

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Script template is missing placeholder {0}")]
    MissingPlaceholder(&'static str),

    #[error("Failed to serialize instructions: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the script needs beyond the configuration: color hex values and
/// local copies of image assets, keyed by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationAssets {
    pub colors: BTreeMap<String, String>,
    pub local_files: BTreeMap<String, String>,
}

/// JSON document substituted for `{{INSTRUCTIONS_JSON}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationPayload {
    pub configuration: VariantConfiguration,
    pub assets: AutomationAssets,
}

/// Escape `value` for a double-quoted script string literal.
pub fn escape_for_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Substitute the three placeholders in one pass. Values are escaped, and
/// text that happens to look like a placeholder inside a value is left as
/// is.
pub fn render_script(
    template: &str,
    template_path: &str,
    output_base: &str,
    instructions_json: &str,
) -> Result<String, TemplateError> {
    for placeholder in [TEMPLATE_PATH, OUTPUT_BASE, INSTRUCTIONS_JSON] {
        if !template.contains(placeholder) {
            return Err(TemplateError::MissingPlaceholder(placeholder));
        }
    }

    let template_path = escape_for_string_literal(template_path);
    let output_base = escape_for_string_literal(output_base);
    let instructions_json = escape_for_string_literal(instructions_json);

    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
        match &caps[1] {
            "TEMPLATE_PATH" => template_path.clone(),
            "OUTPUT_BASE" => output_base.clone(),
            _ => instructions_json.clone(),
        }
    });
    Ok(rendered.into_owned())
}

/// Render [`AUTOMATION_TEMPLATE`] for one job.
pub fn render_automation_script(
    template_path: &str,
    output_base: &str,
    payload: &AutomationPayload,
) -> Result<String, TemplateError> {
    let json = serde_json::to_string(payload)?;
    render_script(AUTOMATION_TEMPLATE, template_path, output_base, &json)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
