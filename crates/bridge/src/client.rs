//! HTTP client for the kitforge service.

use std::path::Path;
use std::time::Duration;

use kitforge_core::production::{ArtifactMap, ExportFormat};
use kitforge_core::types::DbId;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::source::{ClaimedInstruction, InstructionSource};

/// `{ "data": T }` envelope used by every service response.
#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct StoredArtifact {
    artifact_ref: String,
}

/// Body of `PATCH /design-instructions/{id}`.
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<&'a ArtifactMap>,
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// * `base_url` - service root, e.g. `http://localhost:3000`.
    /// * `timeout` - limit for each request, including body transfer, so a
    ///   stalled download or report cannot hold up the job queue.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// Absolute URL for `url`; refs served by the service itself are
    /// relative.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            url.to_string()
        }
    }

    async fn report(&self, id: DbId, report: &StatusReport<'_>) -> Result<(), BridgeError> {
        let response = self
            .client
            .patch(self.api(&format!("/design-instructions/{id}")))
            .json(report)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BridgeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_data<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BridgeError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<DataResponse<T>>().await?.data)
    }
}

impl InstructionSource for ApiClient {
    async fn claim_pending(&self, limit: i64) -> Result<Vec<ClaimedInstruction>, BridgeError> {
        let response = self
            .client
            .post(self.api("/design-instructions/claim"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::parse_data(response).await
    }

    async fn mark_generating(&self, id: DbId) -> Result<(), BridgeError> {
        self.report(
            id,
            &StatusReport {
                status: "processing",
                error_message: None,
                artifacts: None,
            },
        )
        .await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), BridgeError> {
        let response = self.client.get(self.resolve(url)).send().await?;
        let bytes = Self::ensure_success(response).await?.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(url, size = bytes.len(), "Downloaded file");
        Ok(())
    }

    async fn upload_artifact(
        &self,
        id: DbId,
        format: ExportFormat,
        path: &Path,
    ) -> Result<String, BridgeError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = format!("{}.{}", format.as_str(), format.extension());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(format.content_type())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.api(&format!("/design-instructions/{id}/artifacts/{format}")))
            .multipart(form)
            .send()
            .await?;
        let stored: StoredArtifact = Self::parse_data(response).await?;
        Ok(stored.artifact_ref)
    }

    async fn complete(&self, id: DbId, artifacts: &ArtifactMap) -> Result<(), BridgeError> {
        self.report(
            id,
            &StatusReport {
                status: "completed",
                error_message: None,
                artifacts: Some(artifacts),
            },
        )
        .await
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<(), BridgeError> {
        self.report(
            id,
            &StatusReport {
                status: "failed",
                error_message: Some(message),
                artifacts: None,
            },
        )
        .await
    }
}
