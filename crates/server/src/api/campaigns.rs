//! Campaign API handlers: the live bid window and recent decisions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bidpipe_core::{BidDecision, BidEvent};

use crate::state::AppState;

/// Upper bound on any `limit` query parameter.
const MAX_LIMIT: usize = 1000;

const DEFAULT_BID_LIMIT: usize = 50;
const DEFAULT_DECISION_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct BidWindowResponse {
    pub campaign_id: String,
    pub bids: Vec<BidEvent>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DecisionsResponse {
    pub campaign_id: String,
    pub decisions: Vec<BidDecision>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn unavailable(error: impl ToString) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Most recent bids for a campaign, newest first.
pub async fn recent_bids(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<BidWindowResponse>, ApiError> {
    let bids = state
        .store()
        .recent_bids(&campaign_id, query.resolve(DEFAULT_BID_LIMIT))
        .await
        .map_err(unavailable)?;

    Ok(Json(BidWindowResponse {
        campaign_id,
        count: bids.len(),
        bids,
    }))
}

/// Most recent decisions recorded for a campaign, newest first.
pub async fn recent_decisions(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<DecisionsResponse>, ApiError> {
    let decisions = state
        .ledger()
        .recent_decisions(&campaign_id, query.resolve(DEFAULT_DECISION_LIMIT))
        .map_err(unavailable)?;

    Ok(Json(DecisionsResponse {
        campaign_id,
        count: decisions.len(),
        decisions,
    }))
}
