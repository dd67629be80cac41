//! Decision ledger - append-only record of every bid decision.

mod sqlite;

pub use sqlite::SqliteDecisionLedger;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::BidDecision;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger database error: {0}")]
    Database(String),
}

/// Write interface for decisions.
///
/// Implementations must accept concurrent `save_decision` calls from
/// many evaluation units at once.
#[async_trait]
pub trait DecisionLedger: Send + Sync {
    async fn save_decision(&self, decision: &BidDecision) -> Result<(), LedgerError>;

    async fn ping(&self) -> Result<(), LedgerError>;
}
