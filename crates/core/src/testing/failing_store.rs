//! A bid store whose backend is always down.

use async_trait::async_trait;

use crate::bid_store::{BidStore, ScanPage, StoreError};
use crate::model::BidEvent;

/// Every operation fails with [`StoreError::Unavailable`].
#[derive(Debug, Default)]
pub struct FailingBidStore {
    reason: String,
}

impl FailingBidStore {
    pub fn new() -> Self {
        Self::with_reason("connection refused")
    }

    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

#[async_trait]
impl BidStore for FailingBidStore {
    async fn put(&self, _event: &BidEvent) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn scan_page(
        &self,
        _campaign_id: &str,
        _cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<ScanPage, StoreError> {
        Err(self.error())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Err(self.error())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(self.error())
    }
}
