//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the design API, the health probe, and static serving of
//! rendered artifacts under a single Axum router.

pub mod designs;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::design::OUTPUT_URL_PREFIX;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let artifacts = ServeDir::new(&state.config.output_dir);
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/api/submit-design", post(designs::submit_design))
        .route("/api/designs", get(designs::list_designs))
        .route("/api/designs/{id}", get(designs::get_design))
        .route("/healthz", get(healthz))
        .nest_service(OUTPUT_URL_PREFIX, artifacts)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
