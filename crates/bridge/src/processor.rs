//! Runs one production instruction through the design tool.
//!
//! A job either completes with the exports that were uploaded or fails
//! with a message the operator sees on the variant. Local files are
//! removed afterwards either way.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kitforge_core::production::{ArtifactMap, InstructionSnapshot};
use kitforge_core::scripting::{
    render_automation_script, AutomationAssets, AutomationPayload, ScriptError, ScriptExecutor,
    ScriptInput, TemplateError,
};
use kitforge_core::types::DbId;

use crate::error::BridgeError;
use crate::exports::{collect_exports, remove_exports};
use crate::source::{ClaimedInstruction, InstructionSource};

/// Environment passed to the design tool alongside the script.
pub const ENV_OUTPUT_BASE: &str = "KITFORGE_OUTPUT_BASE";
pub const ENV_TEMPLATE_PATH: &str = "KITFORGE_TEMPLATE_PATH";

/// Why a job failed. The display text is reported as the error message.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error("variant not found")]
    Orphaned,

    #[error("Could not start production: {0}")]
    Start(BridgeError),

    #[error("Instruction snapshot is unreadable: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Failed to download master document: {0}")]
    Download(BridgeError),

    #[error("Failed to render automation script: {0}")]
    Template(#[from] TemplateError),

    #[error("{}", .0.diagnostic())]
    Script(#[from] ScriptError),

    #[error("No exports were uploaded")]
    NoExports,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { uploaded: usize },
    Failed { message: String },
}

/// Directories and limits for job processing.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

pub struct JobProcessor<S, E> {
    source: S,
    executor: E,
    settings: ProcessorSettings,
}

impl<S: InstructionSource, E: ScriptExecutor> JobProcessor<S, E> {
    pub fn new(source: S, executor: E, settings: ProcessorSettings) -> Self {
        Self {
            source,
            executor,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Process one claimed job and report the result. Reporting errors are
    /// logged, never returned.
    pub async fn process(&self, job: &ClaimedInstruction) -> JobOutcome {
        tracing::info!(job_id = job.id, variant_id = ?job.variant_id, "Processing job");

        let outcome = match self.produce(job).await {
            Ok(artifacts) => {
                if let Err(e) = self.source.complete(job.id, &artifacts).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to report completion");
                }
                tracing::info!(job_id = job.id, uploaded = artifacts.len(), "Job completed");
                JobOutcome::Completed {
                    uploaded: artifacts.len(),
                }
            }
            Err(failure) => {
                let message = failure.to_string();
                tracing::warn!(job_id = job.id, error = %message, "Job failed");
                if let Err(e) = self.source.fail(job.id, &message).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to report failure");
                }
                JobOutcome::Failed { message }
            }
        };

        self.cleanup(job.id).await;
        outcome
    }

    async fn produce(&self, job: &ClaimedInstruction) -> Result<ArtifactMap, JobFailure> {
        if job.variant_id.is_none() {
            return Err(JobFailure::Orphaned);
        }

        self.source
            .mark_generating(job.id)
            .await
            .map_err(JobFailure::Start)?;

        let snapshot = job.snapshot()?;
        let job_dir = self.job_dir(job.id);
        tokio::fs::create_dir_all(&job_dir).await?;
        tokio::fs::create_dir_all(&self.settings.output_dir).await?;

        let master = job_dir.join(master_file_name(&job.master_document_url));
        self.source
            .download(&job.master_document_url, &master)
            .await
            .map_err(JobFailure::Download)?;

        let local_files = self.download_assets(job.id, &snapshot, &job_dir).await;
        let payload = AutomationPayload {
            configuration: snapshot.configuration,
            assets: AutomationAssets {
                colors: snapshot.assets.colors,
                local_files,
            },
        };

        let output_base = self.output_base(job.id);
        let template_path = master.to_string_lossy();
        let output_base_str = output_base.to_string_lossy();
        let script = render_automation_script(&template_path, &output_base_str, &payload)?;

        // Removed when dropped, whatever the outcome.
        let script_file = tempfile::Builder::new()
            .prefix("automation-")
            .suffix(".jsx")
            .tempfile_in(&job_dir)?;
        tokio::fs::write(script_file.path(), script).await?;

        let input = ScriptInput::with_timeout(self.settings.timeout)
            .in_dir(&job_dir)
            .env(ENV_OUTPUT_BASE, output_base_str.to_string())
            .env(ENV_TEMPLATE_PATH, template_path.to_string());
        let script_path = script_file.path().to_string_lossy().into_owned();
        let output = self
            .executor
            .execute(&script_path, input)
            .await?
            .ensure_success()?;
        tracing::info!(job_id = job.id, duration_ms = output.duration_ms, "Design tool finished");

        let mut uploaded = ArtifactMap::new();
        for (format, export) in collect_exports(&output_base).await {
            let path = match export {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(job_id = job.id, error = %e, "Export unavailable");
                    continue;
                }
            };
            match self.source.upload_artifact(job.id, format, &path).await {
                Ok(artifact_ref) => {
                    uploaded.insert(format, artifact_ref);
                }
                Err(e) => {
                    tracing::error!(job_id = job.id, %format, error = %e, "Upload failed");
                }
            }
        }

        if uploaded.is_empty() {
            return Err(JobFailure::NoExports);
        }
        Ok(uploaded)
    }

    /// Fetch logo, pattern and embellishment images. An asset that cannot
    /// be fetched is left out; the script skips placements without a file.
    async fn download_assets(
        &self,
        job_id: DbId,
        snapshot: &InstructionSnapshot,
        job_dir: &Path,
    ) -> BTreeMap<String, String> {
        let assets = &snapshot.assets;
        let wanted = assets
            .logos
            .iter()
            .chain(&assets.patterns)
            .chain(&assets.embellishments);

        let mut local_files = BTreeMap::new();
        for (index, (asset_id, url)) in wanted.enumerate() {
            if local_files.contains_key(asset_id) {
                continue;
            }
            let dest = job_dir
                .join("assets")
                .join(format!("{index}.{}", url_extension(url).unwrap_or("png")));
            match self.source.download(url, &dest).await {
                Ok(()) => {
                    local_files.insert(asset_id.clone(), dest.to_string_lossy().into_owned());
                }
                Err(e) => {
                    tracing::warn!(
                        job_id,
                        asset_id = %asset_id,
                        error = %e,
                        "Asset download failed",
                    );
                }
            }
        }
        local_files
    }

    fn job_dir(&self, job_id: DbId) -> PathBuf {
        self.settings.work_dir.join(format!("job-{job_id}"))
    }

    fn output_base(&self, job_id: DbId) -> PathBuf {
        self.settings.output_dir.join(format!("job-{job_id}"))
    }

    async fn cleanup(&self, job_id: DbId) {
        remove_exports(&self.output_base(job_id)).await;
        let job_dir = self.job_dir(job_id);
        match tokio::fs::remove_dir_all(&job_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Failed to remove job directory");
            }
        }
    }
}

/// Last path segment of a URL, without query or fragment.
fn url_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

fn url_extension(url: &str) -> Option<&str> {
    url_file_name(url)?
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Local name for the master document, keeping its extension so the
/// design tool recognises it.
fn master_file_name(url: &str) -> String {
    format!("master.{}", url_extension(url).unwrap_or("ai"))
}
