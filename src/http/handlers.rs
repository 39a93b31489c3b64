//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::AppState;
use crate::pipeline::PipelineError;
use crate::transcript::TranscriptResult;

/// Service name reported by the liveness probe
pub const SERVICE_NAME: &str = "DeepRead Subtitle API";

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    InvalidUrl,
    BadRequest(StatusCode, String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::InvalidUrl => (StatusCode::BAD_REQUEST, "Invalid YouTube URL".to_string()),
            HttpError::BadRequest(status, msg) => (status, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.status(), rejection.body_text())
    }
}

impl From<PipelineError> for HttpError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidUrl => HttpError::InvalidUrl,
            PipelineError::AllFailed(_) => HttpError::NotFound(err.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,

    #[serde(flatten)]
    pub result: TranscriptResult,
}

/// Liveness probe
/// GET /
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Transcript extraction
/// POST /extract
pub async fn extract(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, HttpError> {
    let Json(request) = payload?;
    let pipeline = state.pipeline.clone();
    let url = request.url;

    // A panic inside a strategy surfaces as a JoinError instead of a dropped connection
    let outcome = tokio::spawn(async move { pipeline.extract(&url).await })
        .await
        .map_err(|e| {
            tracing::error!("Extraction task failed: {}", e);
            HttpError::InternalError(e.to_string())
        })?;

    match outcome {
        Ok(result) => Ok(Json(ExtractResponse {
            success: true,
            result,
        })),
        Err(err) => {
            tracing::warn!("Extraction failed: {}", err);
            Err(err.into())
        }
    }
}
