use std::sync::Arc;

use sqlx::PgPool;

use crate::ingest::pipeline::IngestPipeline;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn ObjectStore>,
    /// The ingestion pipeline with its collaborators wired at startup.
    pub pipeline: Arc<IngestPipeline>,
}
