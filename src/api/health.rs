//! Health and readiness endpoints

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::{Json, INTERNAL_ERROR_DETAIL};
use crate::domain::DomainError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Readiness of the service and its vector store
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: ReadyStatus,
    pub version: String,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadyStatus {
    Ready,
    Unavailable,
}

/// GET /api/health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// GET /api/ready - 503 until documents have been ingested
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store = state.pipeline.store();

    let (status, vector_count, detail) = match store.count().await {
        Ok(count) => (ReadyStatus::Ready, Some(count), None),
        Err(e @ DomainError::VectorStoreNotFound { .. }) => {
            (ReadyStatus::Unavailable, None, Some(e.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Vector store check failed");
            (ReadyStatus::Unavailable, None, Some(INTERNAL_ERROR_DETAIL.to_string()))
        }
    };

    let response = ReadyResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: store.collection().to_string(),
        vector_count,
        detail,
        latency_ms: start.elapsed().as_millis() as u64,
    };

    let status_code = match status {
        ReadyStatus::Ready => StatusCode::OK,
        ReadyStatus::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}
