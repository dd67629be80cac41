//! Campaign catalog - the read side of the relational campaign store.
//!
//! The orchestrator only ever asks for the active campaign set; writes are
//! owned by whoever manages campaigns and are exposed here for seeding.

mod sqlite;

pub use sqlite::SqliteCampaignCatalog;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Campaign;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog database error: {0}")]
    Database(String),
}

/// Query interface over the campaign catalog.
#[async_trait]
pub trait CampaignCatalog: Send + Sync {
    /// All campaigns whose `active` flag is set.
    async fn active_campaigns(&self) -> Result<Vec<Campaign>, CatalogError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), CatalogError>;
}
