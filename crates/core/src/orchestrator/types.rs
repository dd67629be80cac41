//! Types for the decision orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bid_store::StoreError;
use crate::catalog::CatalogError;
use crate::ledger::LedgerError;

/// Errors that abort a whole tick.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The campaign catalog could not be read; the tick is skipped.
    #[error("campaign catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Errors confined to a single campaign's evaluation.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("failed to read bid window: {0}")]
    WindowRead(#[from] StoreError),

    #[error("failed to save decision: {0}")]
    LedgerWrite(#[from] LedgerError),

    #[error("evaluation task panicked: {0}")]
    Panicked(String),
}

/// One campaign that failed during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignFailure {
    pub campaign_id: String,
    pub error: String,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick sequence number.
    pub tick: u64,
    /// Active campaigns loaded for this tick.
    pub campaigns: usize,
    /// Decisions persisted to the ledger.
    pub decisions_saved: usize,
    /// Persisted decisions with `should_bid = true`.
    pub bids_placed: usize,
    pub failures: Vec<CampaignFailure>,
    pub duration_ms: u64,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Ticks that completed their fan-out (skipped ticks are not counted).
    pub ticks_completed: u64,
    /// Report of the most recent completed tick.
    pub last_tick: Option<TickReport>,
    /// When the most recent tick completed.
    pub last_tick_at: Option<DateTime<Utc>>,
}
