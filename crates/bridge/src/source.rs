//! Where the bridge gets its work and reports results.
//!
//! [`InstructionSource`] is the seam between the job processor and the
//! service. [`ApiClient`](crate::client::ApiClient) talks HTTP; tests
//! substitute in-memory fakes.

use std::future::Future;
use std::path::Path;

use kitforge_core::production::{ArtifactMap, ExportFormat, InstructionSnapshot};
use kitforge_core::types::DbId;
use serde::Deserialize;

use crate::error::BridgeError;

/// A claimed production instruction as the service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimedInstruction {
    pub id: DbId,
    /// `None` when the variant was deleted after the job was queued.
    pub variant_id: Option<DbId>,
    pub status: String,
    pub priority: i32,
    pub instructions: serde_json::Value,
    pub master_document_url: String,
}

impl ClaimedInstruction {
    /// Decode the snapshot taken when the job was queued.
    pub fn snapshot(&self) -> Result<InstructionSnapshot, serde_json::Error> {
        InstructionSnapshot::deserialize(&self.instructions)
    }
}

pub trait InstructionSource: Send + Sync {
    /// Claim up to `limit` pending instructions.
    fn claim_pending(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ClaimedInstruction>, BridgeError>> + Send;

    fn mark_generating(&self, id: DbId) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Fetch `url` into the file at `dest`.
    fn download(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Upload one exported file and return its artifact ref.
    fn upload_artifact(
        &self,
        id: DbId,
        format: ExportFormat,
        path: &Path,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    fn complete(
        &self,
        id: DbId,
        artifacts: &ArtifactMap,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn fail(&self, id: DbId, message: &str) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
