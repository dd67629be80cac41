//! SQLite-backed campaign catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{CampaignCatalog, CatalogError};
use crate::model::Campaign;

/// SQLite-backed campaign catalog.
pub struct SqliteCampaignCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCampaignCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                budget REAL NOT NULL,
                target_reach INTEGER NOT NULL,
                preferred_platform TEXT NOT NULL,
                max_cpc REAL NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_campaigns_active ON campaigns(active);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Database("connection lock poisoned".to_string()))
    }

    /// Insert or replace a campaign.
    pub fn upsert(&self, campaign: &Campaign) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (id, budget, target_reach, preferred_platform, max_cpc, active)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                budget = excluded.budget,
                target_reach = excluded.target_reach,
                preferred_platform = excluded.preferred_platform,
                max_cpc = excluded.max_cpc,
                active = excluded.active",
            params![
                campaign.id,
                campaign.budget,
                campaign.target_reach,
                campaign.preferred_platform,
                campaign.max_cpc,
                campaign.active,
            ],
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(())
    }

    /// Flip a campaign's active flag. Returns false if the campaign is unknown.
    pub fn set_active(&self, id: &str, active: bool) -> Result<bool, CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE campaigns SET active = ? WHERE id = ?",
                params![active, id],
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(changed > 0)
    }
}

#[async_trait]
impl CampaignCatalog for SqliteCampaignCatalog {
    async fn active_campaigns(&self) -> Result<Vec<Campaign>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, budget, target_reach, preferred_platform, max_cpc
                 FROM campaigns WHERE active = 1 ORDER BY id",
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Campaign {
                    id: row.get(0)?,
                    budget: row.get(1)?,
                    target_reach: row.get(2)?,
                    preferred_platform: row.get(3)?,
                    max_cpc: row.get(4)?,
                    active: true,
                })
            })
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(campaigns)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| CatalogError::Database(e.to_string()))
    }
}
