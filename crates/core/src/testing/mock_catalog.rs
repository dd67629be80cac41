//! Mock campaign catalog for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::{CampaignCatalog, CatalogError};
use crate::model::Campaign;

/// Mock implementation of the CampaignCatalog trait.
///
/// Holds an in-memory campaign list and can be switched into a failing mode
/// to simulate an unreachable database.
#[derive(Debug, Clone, Default)]
pub struct MockCampaignCatalog {
    campaigns: Arc<RwLock<Vec<Campaign>>>,
    failing: Arc<RwLock<bool>>,
    queries: Arc<RwLock<usize>>,
}

impl MockCampaignCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the campaign list. Inactive campaigns are kept but never returned.
    pub async fn set_campaigns(&self, campaigns: Vec<Campaign>) {
        *self.campaigns.write().await = campaigns;
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// How many times `active_campaigns` has been called.
    pub async fn query_count(&self) -> usize {
        *self.queries.read().await
    }
}

#[async_trait]
impl CampaignCatalog for MockCampaignCatalog {
    async fn active_campaigns(&self) -> Result<Vec<Campaign>, CatalogError> {
        *self.queries.write().await += 1;
        if *self.failing.read().await {
            return Err(CatalogError::Database("mock catalog unavailable".to_string()));
        }
        Ok(self
            .campaigns
            .read()
            .await
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        if *self.failing.read().await {
            return Err(CatalogError::Database("mock catalog unavailable".to_string()));
        }
        Ok(())
    }
}
