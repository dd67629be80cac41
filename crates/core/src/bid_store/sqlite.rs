//! SQLite-backed bid store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, Connection};

use super::{
    retention_delta, system_clock, BidStore, Clock, ScanPage, StoreError, StoredBid,
    DEFAULT_SCAN_PAGE_SIZE,
};
use crate::model::BidEvent;

/// SQLite-backed bid window.
///
/// Expiry is stored as unix milliseconds; reads filter on it so an entry
/// past its horizon is invisible even before the sweeper deletes it.
pub struct SqliteBidStore {
    conn: Mutex<Connection>,
    retention: TimeDelta,
    page_size: usize,
    clock: Clock,
}

impl SqliteBidStore {
    /// Open (or create) the store at `path`.
    pub fn new(path: &Path, retention: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::from_connection(conn, retention)
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory(retention: Duration) -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::from_connection(conn, retention)
    }

    fn from_connection(conn: Connection, retention: Duration) -> Result<Self, StoreError> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention: retention_delta(retention),
            page_size: DEFAULT_SCAN_PAGE_SIZE,
            clock: system_clock(),
        })
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

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bid_window (
                key TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bid_window_campaign ON bid_window(campaign_id, key);
            CREATE INDEX IF NOT EXISTS idx_bid_window_expires ON bid_window(expires_at);
            "#,
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn now_millis(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }
}

#[async_trait]
impl BidStore for SqliteBidStore {
    async fn put(&self, event: &BidEvent) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(event).map_err(|e| StoreError::Encode(e.to_string()))?;
        let expires_at = ((self.clock)() + self.retention).timestamp_millis();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO bid_window (key, campaign_id, payload, expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, expires_at = excluded.expires_at",
            params![event.store_key(), event.campaign_id, payload, expires_at],
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn scan_page(
        &self,
        campaign_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, StoreError> {
        let page_size = page_size.max(1);
        let now = self.now_millis();
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT key, payload, expires_at FROM bid_window
                 WHERE campaign_id = ?1 AND (?2 IS NULL OR key < ?2) AND expires_at > ?3
                 ORDER BY key DESC LIMIT ?4",
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // One extra row tells us whether another page exists.
        let rows = stmt
            .query_map(
                params![campaign_id, cursor, now, page_size as i64 + 1],
                |row| {
                    let key: String = row.get(0)?;
                    let payload: String = row.get(1)?;
                    let expires_at: i64 = row.get(2)?;
                    Ok((key, payload, expires_at))
                },
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, payload, expires_at) =
                row.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let expires_at = DateTime::<Utc>::from_timestamp_millis(expires_at)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            entries.push(StoredBid {
                key,
                payload,
                expires_at,
            });
        }

        let next_cursor = if entries.len() > page_size {
            entries.truncate(page_size);
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(ScanPage {
            entries,
            next_cursor,
        })
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.now_millis();
        let conn = self.lock()?;
        conn.execute("DELETE FROM bid_window WHERE expires_at <= ?", params![now])
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn scan_page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid_store::DEFAULT_RETENTION;
    use crate::testing::{fixtures, ManualClock};
    use tempfile::TempDir;

    fn store_with_clock(clock: &ManualClock, retention: Duration) -> SqliteBidStore {
        SqliteBidStore::in_memory(retention)
            .unwrap()
            .with_clock(clock.clock())
    }

    #[tokio::test]
    async fn test_put_and_recent_bids() {
        let store = SqliteBidStore::in_memory(DEFAULT_RETENTION).unwrap();
        for minute in [4, 1, 3, 0, 2] {
            store
                .put(&fixtures::bid_at("c1", "google", minute as f64, 0.05, minute))
                .await
                .unwrap();
        }

        let bids = store.recent_bids("c1", 3).await.unwrap();
        let cpcs: Vec<f64> = bids.iter().map(|b| b.current_cpc).collect();
        assert_eq!(cpcs, vec![4.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn test_upsert_same_key() {
        let store = SqliteBidStore::in_memory(DEFAULT_RETENTION).unwrap();
        let bid = fixtures::bid_at("c1", "google", 1.0, 0.05, 0);
        store.put(&bid).await.unwrap();
        store.put(&bid).await.unwrap();

        let page = store.scan_page("c1", None, 10).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_expired_rows_invisible_then_purged() {
        let clock = ManualClock::new(fixtures::minute(0));
        let store = store_with_clock(&clock, Duration::from_secs(3600));

        store
            .put(&fixtures::bid_at("c1", "google", 1.0, 0.05, 0))
            .await
            .unwrap();
        clock.advance(TimeDelta::minutes(30));
        store
            .put(&fixtures::bid_at("c1", "google", 2.0, 0.05, 1))
            .await
            .unwrap();

        clock.advance(TimeDelta::minutes(45));
        let bids = store.recent_bids("c1", 10).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].current_cpc, 2.0);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        clock.advance(TimeDelta::hours(1));
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.recent_bids("c1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyset_pagination() {
        let store = SqliteBidStore::in_memory(DEFAULT_RETENTION).unwrap();
        for minute in 0..7 {
            store
                .put(&fixtures::bid_at("c1", "meta", 1.0, 0.05, minute))
                .await
                .unwrap();
        }

        let first = store.scan_page("c1", None, 3).await.unwrap();
        assert_eq!(first.entries.len(), 3);
        let cursor = first.next_cursor.clone().unwrap();

        let second = store.scan_page("c1", Some(&cursor), 3).await.unwrap();
        assert_eq!(second.entries.len(), 3);
        assert!(second.entries.iter().all(|e| e.key < cursor));

        let third = store
            .scan_page("c1", second.next_cursor.as_deref(), 3)
            .await
            .unwrap();
        assert_eq!(third.entries.len(), 1);
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_pages_run_newest_first() {
        let store = SqliteBidStore::in_memory(DEFAULT_RETENTION)
            .unwrap()
            .with_page_size(10);
        for minute in 0..150 {
            store
                .put(&fixtures::bid_at("c1", "google", 1.0, 0.05, minute))
                .await
                .unwrap();
        }

        let first = store.scan_page("c1", None, 10).await.unwrap();
        assert_eq!(
            first.entries[0].key,
            fixtures::bid_at("c1", "google", 1.0, 0.05, 149).store_key()
        );

        let bids = store.recent_bids("c1", 50).await.unwrap();
        assert_eq!(bids.len(), 50);
        assert_eq!(bids[0].observed_at, fixtures::minute(149));
        assert_eq!(bids[49].observed_at, fixtures::minute(100));
    }

    #[tokio::test]
    async fn test_campaign_column_prevents_prefix_collisions() {
        let store = SqliteBidStore::in_memory(DEFAULT_RETENTION).unwrap();
        store
            .put(&fixtures::bid_at("c1", "google", 1.0, 0.05, 0))
            .await
            .unwrap();
        store
            .put(&fixtures::bid_at("c1:google", "x", 1.0, 0.05, 0))
            .await
            .unwrap();

        let page = store.scan_page("c1", None, 10).await.unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bids.db");

        {
            let store = SqliteBidStore::new(&path, DEFAULT_RETENTION).unwrap();
            store
                .put(&fixtures::bid_at("c1", "google", 1.0, 0.05, 0))
                .await
                .unwrap();
        }

        let reopened = SqliteBidStore::new(&path, DEFAULT_RETENTION).unwrap();
        assert!(reopened.ping().await.is_ok());
        assert_eq!(reopened.recent_bids("c1", 10).await.unwrap().len(), 1);
    }
}
