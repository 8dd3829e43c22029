//! Artifact storage for previews and production exports.
//!
//! A stored artifact is addressed by its ref, the public URL returned from
//! [`ArtifactStore::put`]. [`LocalArtifactStore`] keeps files under a
//! directory that the router serves at the configured base URL.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::config::ArtifactConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid artifact key '{0}'")]
    InvalidKey(String),

    #[error("artifact ref '{0}' does not belong to this store")]
    ForeignRef(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Store `bytes` under `key` (a relative, `/`-separated path) and
    /// return the artifact ref.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StoreError>;

    /// Remove a previously stored artifact. Deleting a missing artifact
    /// succeeds.
    async fn delete(&self, artifact_ref: &str) -> Result<(), StoreError>;

    /// Confirm the store can accept writes.
    async fn check(&self) -> Result<(), StoreError>;
}

/// [`ArtifactStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    base_url: String,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(config.dir.clone(), config.base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for_ref<'a>(&self, artifact_ref: &'a str) -> Result<&'a str, StoreError> {
        artifact_ref
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StoreError::ForeignRef(artifact_ref.to_string()))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(key, size, content_type, "Stored artifact");
        Ok(format!("{}/{key}", self.base_url))
    }

    async fn delete(&self, artifact_ref: &str) -> Result<(), StoreError> {
        let key = self.key_for_ref(artifact_ref)?;
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn check(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let metadata = tokio::fs::metadata(&self.root).await?;
        if metadata.permissions().readonly() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.root.display()),
            )));
        }
        Ok(())
    }
}
