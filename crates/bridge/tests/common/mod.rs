#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kitforge_bridge::error::BridgeError;
use kitforge_bridge::exports::export_path;
use kitforge_bridge::processor::{JobProcessor, ProcessorSettings, ENV_OUTPUT_BASE};
use kitforge_bridge::source::{ClaimedInstruction, InstructionSource};
use kitforge_core::production::{ArtifactMap, ExportFormat};
use kitforge_core::scripting::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use kitforge_core::types::DbId;
use serde_json::json;
use tokio::sync::Notify;

pub const MASTER_URL: &str = "https://files.example/templates/home.ai";

/// Something the bridge reported back to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Generating(DbId),
    Uploaded(DbId, ExportFormat),
    Completed(DbId, Vec<ExportFormat>),
    Failed(DbId, String),
}

/// In-memory service. Claims hand out queued batches in order.
#[derive(Default)]
pub struct FakeSource {
    batches: Mutex<VecDeque<Vec<ClaimedInstruction>>>,
    events: Mutex<Vec<Event>>,
    failing_downloads: HashSet<String>,
    /// When set, `claim_pending` waits for a notification first.
    pub gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn with_batch(batch: Vec<ClaimedInstruction>) -> Self {
        let source = Self::default();
        source.push_batch(batch);
        source
    }

    pub fn push_batch(&self, batch: Vec<ClaimedInstruction>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn failing_download(mut self, url: &str) -> Self {
        self.failing_downloads.insert(url.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl InstructionSource for FakeSource {
    async fn claim_pending(&self, _limit: i64) -> Result<Vec<ClaimedInstruction>, BridgeError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn mark_generating(&self, id: DbId) -> Result<(), BridgeError> {
        self.record(Event::Generating(id));
        Ok(())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), BridgeError> {
        if self.failing_downloads.contains(url) {
            return Err(BridgeError::Api {
                status: 404,
                body: "not found".into(),
            });
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, url.as_bytes()).await?;
        Ok(())
    }

    async fn upload_artifact(
        &self,
        id: DbId,
        format: ExportFormat,
        path: &Path,
    ) -> Result<String, BridgeError> {
        tokio::fs::metadata(path).await?;
        self.record(Event::Uploaded(id, format));
        Ok(format!("/artifacts/exports/{id}/{}.{}", format.as_str(), format.extension()))
    }

    async fn complete(&self, id: DbId, artifacts: &ArtifactMap) -> Result<(), BridgeError> {
        self.record(Event::Completed(id, artifacts.keys().copied().collect()));
        Ok(())
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<(), BridgeError> {
        self.record(Event::Failed(id, message.to_string()));
        Ok(())
    }
}

/// Stands in for the design tool: writes the chosen exports next to the
/// output base it is given and exits with `exit_code`.
pub struct FakeExecutor {
    pub formats: Vec<ExportFormat>,
    pub exit_code: i32,
    pub stderr: String,
    /// Job ids whose run fails, matched against the output base name.
    pub failing_jobs: Vec<DbId>,
    /// Job ids whose run hits the script timeout.
    pub timed_out_jobs: Vec<DbId>,
    /// Working directory of every run, in order.
    pub runs_in: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeExecutor {
    pub fn exporting(formats: &[ExportFormat]) -> Self {
        Self {
            formats: formats.to_vec(),
            exit_code: 0,
            stderr: String::new(),
            failing_jobs: Vec::new(),
            timed_out_jobs: Vec::new(),
            runs_in: Mutex::new(Vec::new()),
        }
    }

    pub fn all_formats() -> Self {
        Self::exporting(&ExportFormat::ALL)
    }
}

impl ScriptExecutor for FakeExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        tokio::fs::metadata(script_path).await?;
        self.runs_in
            .lock()
            .unwrap()
            .push(input.working_directory.clone());

        let output_base = input
            .env_vars
            .iter()
            .find(|(key, _)| key == ENV_OUTPUT_BASE)
            .map(|(_, value)| PathBuf::from(value))
            .ok_or_else(|| ScriptError::NotFound(ENV_OUTPUT_BASE.to_string()))?;

        let is_job = |id: &DbId| {
            output_base
                .file_name()
                .is_some_and(|name| name == format!("job-{id}").as_str())
        };
        if self.timed_out_jobs.iter().any(is_job) {
            return Err(ScriptError::Timeout {
                elapsed_ms: input.timeout.as_millis() as u64,
            });
        }
        let exit_code = if self.failing_jobs.iter().any(is_job) {
            1
        } else {
            self.exit_code
        };

        if exit_code == 0 {
            for format in &self.formats {
                tokio::fs::write(export_path(&output_base, *format), b"exported").await?;
            }
        }

        Ok(ScriptOutput {
            stdout: String::new(),
            stderr: self.stderr.clone(),
            exit_code,
            duration_ms: 5,
        })
    }
}

pub fn settings(dir: &Path) -> ProcessorSettings {
    ProcessorSettings {
        work_dir: dir.join("work"),
        output_dir: dir.join("out"),
        timeout: Duration::from_secs(5),
    }
}

pub fn processor(
    source: FakeSource,
    executor: FakeExecutor,
    dir: &Path,
) -> JobProcessor<FakeSource, FakeExecutor> {
    JobProcessor::new(source, executor, settings(dir))
}

/// A claimed job for variant `id * 10` with an empty configuration.
pub fn job(id: DbId) -> ClaimedInstruction {
    ClaimedInstruction {
        id,
        variant_id: Some(id * 10),
        status: "processing".to_string(),
        priority: 0,
        instructions: json!({
            "variant_name": format!("Variant {id}"),
            "template_id": 1,
            "configuration": {},
            "assets": {},
        }),
        master_document_url: MASTER_URL.to_string(),
    }
}
