//! Decision orchestrator.
//!
//! Drives the periodic pricing pass:
//! - **Tick**: load active campaigns from the catalog (a failure skips the tick)
//! - **Fan-out**: one concurrent evaluation per campaign, failures isolated
//! - **Drain**: the tick ends only when every evaluation has finished

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::DecisionOrchestrator;
pub use types::{
    CampaignError, CampaignFailure, OrchestratorError, OrchestratorStatus, TickReport,
};
