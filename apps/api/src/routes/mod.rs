pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ingest::handlers;
use crate::state::AppState;

/// Multipart bodies carry up to a 10 MB file plus form overhead.
const BODY_LIMIT_BYTES: usize = 11 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/uploads",
            post(handlers::handle_upload).get(handlers::handle_list_uploads),
        )
        .route("/api/v1/parse", post(handlers::handle_parse))
        .route(
            "/api/v1/uploads/:id/candidate",
            get(handlers::handle_get_candidate),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
