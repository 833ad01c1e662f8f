//! SqliteHistoryStore
//! --------------------
//! SQLite-backed implementation of the [`HistoryStore`] trait. It is
//! responsible for durable persistence of the trading day so that:
//!
//!  - the snapshot log survives restarts within the same day
//!  - session candles can re-seed per-instrument baselines mid-session
//!  - day rollover wipes everything in one place
//!  - the manager and engine operate purely in-memory otherwise
//!
//! Records are stored as JSON blobs keyed by day (and instrument for
//! candles); the log is bounded, so whole-record upserts stay cheap.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use analytics::MarketSnapshot;

use super::HistoryStore;
use crate::model::{PersistedDay, SessionCandle};

const DAY_MARKER_KEY: &str = "trading_day";

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Wrap an existing pool and ensure the schema exists.
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Connect to a SQLite database and ensure the schema exists.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        Self::from_pool(pool).await
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshot_log (
                day TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                day TEXT NOT NULL,
                security_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (day, security_id)
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    /// Load the persisted day.
    ///
    /// Called once at startup by HistoryManager to reconstruct the
    /// in-memory buffers (or decide to reset them on rollover).
    async fn load(&self) -> anyhow::Result<PersistedDay> {
        let marker = sqlx::query("SELECT value FROM meta WHERE key = ?")
            .bind(DAY_MARKER_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = marker else {
            return Ok(PersistedDay::default());
        };
        let day: String = row.get("value");

        let mut out = PersistedDay {
            day: Some(day.clone()),
            ..Default::default()
        };

        if let Some(row) = sqlx::query("SELECT data FROM snapshot_log WHERE day = ?")
            .bind(&day)
            .fetch_optional(&self.pool)
            .await?
        {
            let data: String = row.get("data");
            out.snapshots = serde_json::from_str::<Vec<MarketSnapshot>>(&data)
                .map_err(|e| anyhow::anyhow!("Invalid snapshot log JSON: {}", e))?;
        }

        let rows = sqlx::query("SELECT security_id, data FROM candles WHERE day = ?")
            .bind(&day)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let security_id: String = row.get("security_id");
            let data: String = row.get("data");
            let candles = serde_json::from_str::<Vec<SessionCandle>>(&data).map_err(|e| {
                anyhow::anyhow!("Invalid candle JSON for {}: {}", security_id, e)
            })?;
            out.candles.insert(security_id, candles);
        }

        Ok(out)
    }

    async fn save_day_marker(&self, day: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value;
        "#,
        )
        .bind(DAY_MARKER_KEY)
        .bind(day)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_snapshots(&self, day: &str, log: &[MarketSnapshot]) -> anyhow::Result<()> {
        let data = serde_json::to_string(log)?;

        sqlx::query(
            r#"
            INSERT INTO snapshot_log (day, data) VALUES (?, ?)
            ON CONFLICT(day) DO UPDATE SET data = excluded.data;
        "#,
        )
        .bind(day)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_candles(
        &self,
        day: &str,
        security_id: &str,
        candles: &[SessionCandle],
    ) -> anyhow::Result<()> {
        let data = serde_json::to_string(candles)?;

        sqlx::query(
            r#"
            INSERT INTO candles (day, security_id, data) VALUES (?, ?, ?)
            ON CONFLICT(day, security_id) DO UPDATE SET data = excluded.data;
        "#,
        )
        .bind(day)
        .bind(security_id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM snapshot_log")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM candles")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM meta WHERE key = ?")
            .bind(DAY_MARKER_KEY)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
