mod config;
mod db;
mod errors;
mod ingest;
mod llm_client;
mod models;
mod repo;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::ingest::pipeline::{IngestPipeline, PipelineConfig};
use crate::llm_client::LlmClient;
use crate::repo::PgIntakeRepo;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ObjectStore, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talentpool API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize extraction client
    let llm = LlmClient::new(
        config.extraction_base_url.clone(),
        config.groq_api_key.clone(),
        config.extraction_model.clone(),
    );
    info!("Extraction client initialized (model: {})", config.extraction_model);

    // Wire the ingestion pipeline
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        Arc::new(PgIntakeRepo::new(db.clone())),
        Arc::new(llm),
        PipelineConfig {
            max_text_chars: config.max_text_chars,
            min_text_chars: config.min_text_chars,
        },
    ));

    // Build app state
    let state = AppState {
        db,
        store,
        pipeline,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talentpool-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
