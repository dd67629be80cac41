//! Mock decision ledger for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ledger::{DecisionLedger, LedgerError};
use crate::model::BidDecision;

/// Mock implementation of the DecisionLedger trait.
///
/// Records every saved decision for assertions. Writes for selected
/// campaigns can be made to fail, or to panic mid-write.
#[derive(Debug, Clone, Default)]
pub struct MockDecisionLedger {
    decisions: Arc<RwLock<Vec<BidDecision>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    panicking: Arc<RwLock<HashSet<String>>>,
}

impl MockDecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All decisions saved so far, in save order.
    pub async fn decisions(&self) -> Vec<BidDecision> {
        self.decisions.read().await.clone()
    }

    /// Make every write for `campaign_id` fail.
    pub async fn fail_for(&self, campaign_id: &str) {
        self.failing.write().await.insert(campaign_id.to_string());
    }

    /// Make every write for `campaign_id` panic.
    pub async fn panic_for(&self, campaign_id: &str) {
        self.panicking.write().await.insert(campaign_id.to_string());
    }
}

#[async_trait]
impl DecisionLedger for MockDecisionLedger {
    async fn save_decision(&self, decision: &BidDecision) -> Result<(), LedgerError> {
        let should_panic = self.panicking.read().await.contains(&decision.campaign_id);
        if should_panic {
            panic!("mock ledger panicked for {}", decision.campaign_id);
        }
        if self.failing.read().await.contains(&decision.campaign_id) {
            return Err(LedgerError::Database(format!(
                "mock write failure for {}",
                decision.campaign_id
            )));
        }
        self.decisions.write().await.push(decision.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}
