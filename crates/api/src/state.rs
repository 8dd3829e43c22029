use std::sync::Arc;

use crate::catalog::DesignCatalog;
use crate::config::ServerConfig;
use crate::storage::ArtifactStore;
use crate::variants::TemplateCache;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: kitforge_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Template and asset lookups.
    pub catalog: Arc<dyn DesignCatalog>,
    /// Where previews and exports are written.
    pub store: Arc<dyn ArtifactStore>,
    /// Parsed templates keyed by id and source fingerprint.
    pub template_cache: Arc<TemplateCache>,
}
