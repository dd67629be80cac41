//! In-memory bid store with per-entry TTL.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::{
    retention_delta, system_clock, BidStore, Clock, ScanPage, StoreError, StoredBid,
    DEFAULT_RETENTION, DEFAULT_SCAN_PAGE_SIZE,
};
use crate::model::{campaign_key_prefix, campaign_key_upper_bound, BidEvent};

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// Ordered in-memory key-value store.
///
/// Keys are kept sorted so a campaign prefix can be enumerated page by page,
/// highest key first, with the last returned key as the cursor.
pub struct MemoryBidStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    retention: TimeDelta,
    page_size: usize,
    clock: Clock,
}

impl Default for MemoryBidStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl MemoryBidStore {
    /// Create a store whose entries expire `retention` after insertion.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            retention: retention_delta(retention),
            page_size: DEFAULT_SCAN_PAGE_SIZE,
            clock: system_clock(),
        }
    }

    /// Use a custom clock for expiry decisions.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Set the number of keys examined per scan page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of physically present entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl BidStore for MemoryBidStore {
    async fn put(&self, event: &BidEvent) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(event).map_err(|e| StoreError::Encode(e.to_string()))?;
        let expires_at = (self.clock)() + self.retention;

        self.entries
            .write()
            .await
            .insert(event.store_key(), Entry { payload, expires_at });
        Ok(())
    }

    async fn scan_page(
        &self,
        campaign_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, StoreError> {
        let prefix = campaign_key_prefix(campaign_id);
        let prefix_end = campaign_key_upper_bound(campaign_id);
        let now = (self.clock)();
        let end = match cursor {
            // BTreeMap::range panics on an inverted range
            Some(before) if before <= prefix.as_str() => return Ok(ScanPage::default()),
            Some(before) => Bound::Excluded(before.min(prefix_end.as_str())),
            None => Bound::Excluded(prefix_end.as_str()),
        };

        let entries = self.entries.read().await;
        let mut keys = entries
            .range::<str, _>((Bound::Included(prefix.as_str()), end))
            .rev()
            .take_while(|(key, _)| key.starts_with(&prefix))
            .peekable();

        let mut page = ScanPage::default();
        let mut last_key = None;
        for _ in 0..page_size.max(1) {
            let Some((key, entry)) = keys.next() else {
                break;
            };
            last_key = Some(key.clone());
            if entry.expires_at > now {
                page.entries.push(StoredBid {
                    key: key.clone(),
                    payload: entry.payload.clone(),
                    expires_at: entry.expires_at,
                });
            }
        }

        if keys.peek().is_some() {
            page.next_cursor = last_key;
        }
        Ok(page)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = (self.clock)();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn scan_page_size(&self) -> usize {
        self.page_size
    }
}
