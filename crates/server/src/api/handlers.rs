use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use bidpipe_core::{IngestState, IngestStats, OrchestratorStatus, SanitizedConfig};

use crate::metrics::collect_dynamic_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Debug, Serialize)]
pub struct IngestionStatus {
    pub state: IngestState,
    pub stats: IngestStats,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub orchestrator: OrchestratorStatus,
    /// Absent when ingestion is not wired into this process.
    pub ingestion: Option<IngestionStatus>,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let orchestrator = state.orchestrator().status().await;
    let ingestion = state.ingestion().map(|handle| IngestionStatus {
        state: handle.state(),
        stats: handle.stats(),
    });

    Json(StatusResponse {
        orchestrator,
        ingestion,
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    collect_dynamic_metrics(&state);

    match state.metrics().encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
