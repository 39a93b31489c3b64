//! Axum router configuration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::pipeline::TranscriptPipeline;

pub mod handlers;

use handlers::{extract, health_check};

/// Shared, read-only state of the HTTP server
pub struct AppState {
    pub pipeline: Arc<TranscriptPipeline>,
}

impl AppState {
    pub fn new(pipeline: TranscriptPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/extract", post(extract))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
