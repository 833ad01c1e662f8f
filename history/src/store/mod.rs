pub mod sqlite_store;

use analytics::MarketSnapshot;

use crate::model::{PersistedDay, SessionCandle};

/// Durable key-value persistence for the current trading day: the
/// snapshot log, the per-instrument candle map, and the day marker.
///
/// Writes are whole-record upserts (the log is small and bounded);
/// the manager decides what to keep, the store only persists it.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the persisted day, if any.
    async fn load(&self) -> anyhow::Result<PersistedDay>;

    /// Rewrite the day marker.
    async fn save_day_marker(&self, day: &str) -> anyhow::Result<()>;

    /// Upsert the full snapshot log for `day`.
    async fn save_snapshots(&self, day: &str, log: &[MarketSnapshot]) -> anyhow::Result<()>;

    /// Upsert one instrument's full candle sequence for `day`.
    async fn save_candles(
        &self,
        day: &str,
        security_id: &str,
        candles: &[SessionCandle],
    ) -> anyhow::Result<()>;

    /// Drop every persisted record (day rollover).
    async fn clear(&self) -> anyhow::Result<()>;
}
