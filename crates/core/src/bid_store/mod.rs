//! Windowed bid store.
//!
//! Holds recent bid observations per campaign with a fixed retention horizon.
//! Backends only implement cursor-driven page scans; the "most recent N"
//! window read is built once on top of [`BidStore::scan_page`] so any
//! key-value backend with incremental enumeration can be substituted.

mod memory;
mod sqlite;
mod sweeper;
mod window;

pub use memory::MemoryBidStore;
pub use sqlite::SqliteBidStore;
pub use sweeper::spawn_expiry_sweeper;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::model::BidEvent;

/// Default retention horizon for stored bids (24h).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of keys examined per scan page.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Source of "now" for expiry decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Longest retention a backend will honour (~100 years).
const MAX_RETENTION_DAYS: i64 = 36_500;

fn retention_delta(retention: Duration) -> TimeDelta {
    TimeDelta::from_std(retention)
        .ok()
        .filter(|delta| delta.num_days() <= MAX_RETENTION_DAYS)
        .unwrap_or_else(|| TimeDelta::days(MAX_RETENTION_DAYS))
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed the operation.
    #[error("bid store unavailable: {0}")]
    Unavailable(String),

    /// The event could not be encoded for storage.
    #[error("failed to encode bid: {0}")]
    Encode(String),
}

/// A raw stored entry as returned by a page scan.
#[derive(Debug, Clone)]
pub struct StoredBid {
    pub key: String,
    /// JSON-encoded [`BidEvent`].
    pub payload: String,
    pub expires_at: DateTime<Utc>,
}

/// One page of a campaign scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub entries: Vec<StoredBid>,
    /// Cursor to resume from, `None` once the campaign's keyspace is exhausted.
    pub next_cursor: Option<String>,
}

/// Trait for windowed bid storage backends.
///
/// Implementations must be safe for concurrent use: ingestion writes while
/// every campaign of an orchestrator tick reads in parallel.
#[async_trait]
pub trait BidStore: Send + Sync {
    /// Store an event under its composite key with a fresh retention TTL.
    ///
    /// Reinserting the same key overwrites the entry and refreshes its TTL.
    async fn put(&self, event: &BidEvent) -> Result<(), StoreError>;

    /// Scan one page of a campaign's entries in descending key order,
    /// resuming below `cursor`.
    ///
    /// Entries past the retention horizon are never returned, even if the
    /// backend has not physically removed them yet.
    async fn scan_page(
        &self,
        campaign_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, StoreError>;

    /// Physically remove expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Number of keys examined per scan page.
    fn scan_page_size(&self) -> usize {
        DEFAULT_SCAN_PAGE_SIZE
    }

    /// Up to `limit` recent bids for a campaign, newest first.
    ///
    /// Returns an empty vector when the campaign has no live bids.
    async fn recent_bids(
        &self,
        campaign_id: &str,
        limit: usize,
    ) -> Result<Vec<BidEvent>, StoreError> {
        window::recent_bids(self, campaign_id, limit, self.scan_page_size()).await
    }
}
