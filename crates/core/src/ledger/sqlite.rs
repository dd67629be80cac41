//! SQLite-backed decision ledger.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{DecisionLedger, LedgerError};
use crate::model::BidDecision;

/// SQLite-backed decision ledger.
pub struct SqliteDecisionLedger {
    conn: Mutex<Connection>,
}

impl SqliteDecisionLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(|e| LedgerError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn =
            Connection::open_in_memory().map_err(|e| LedgerError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bid_decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                bid_amount REAL NOT NULL,
                should_bid INTEGER NOT NULL,
                decided_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bid_decisions_campaign
                ON bid_decisions(campaign_id, id DESC);
            "#,
        )
        .map_err(|e| LedgerError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_decision(row: &rusqlite::Row) -> rusqlite::Result<BidDecision> {
        let decided_at_str: String = row.get(4)?;
        let decided_at = DateTime::parse_from_rfc3339(&decided_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(BidDecision {
            campaign_id: row.get(0)?,
            platform: row.get(1)?,
            bid_amount: row.get(2)?,
            should_bid: row.get(3)?,
            decided_at,
        })
    }

    /// Most recent decisions for a campaign, newest first.
    pub fn recent_decisions(
        &self,
        campaign_id: &str,
        limit: usize,
    ) -> Result<Vec<BidDecision>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT campaign_id, platform, bid_amount, should_bid, decided_at
                 FROM bid_decisions WHERE campaign_id = ?
                 ORDER BY id DESC LIMIT ?",
            )
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![campaign_id, limit as i64], Self::row_to_decision)
            .map_err(|e| LedgerError::Database(e.to_string()))?;

        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(row.map_err(|e| LedgerError::Database(e.to_string()))?);
        }
        Ok(decisions)
    }

    /// Total number of decisions recorded.
    pub fn count(&self) -> Result<i64, LedgerError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM bid_decisions", [], |row| row.get(0))
            .map_err(|e| LedgerError::Database(e.to_string()))
    }
}

#[async_trait]
impl DecisionLedger for SqliteDecisionLedger {
    async fn save_decision(&self, decision: &BidDecision) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO bid_decisions (campaign_id, platform, bid_amount, should_bid, decided_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                decision.campaign_id,
                decision.platform,
                decision.bid_amount,
                decision.should_bid,
                decision.decided_at.to_rfc3339(),
            ],
        )
        .map_err(|e| LedgerError::Database(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| LedgerError::Database(e.to_string()))
    }
}
