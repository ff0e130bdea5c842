//! Axum router — maps all URL paths to handlers.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    citations::{format_citations, match_citations, validate_text},
    claims::analyze,
    generate::generate,
    health::health,
    papers::{add_paper, create_project},
};
use crate::sse::events_handler;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Generation
        .route("/api/generate", post(generate))

        // Library
        .route("/api/projects", post(create_project))
        .route("/api/projects/{project_id}/papers", post(add_paper))

        // Citations
        .route("/api/citations/format",   post(format_citations))
        .route("/api/citations/match",    post(match_citations))
        .route("/api/citations/validate", post(validate_text))

        // Claims / gaps
        .route("/api/claims/analyze", post(analyze))

        // SSE + health
        .route("/api/events", get(events_handler))
        .route("/api/health", get(health))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
