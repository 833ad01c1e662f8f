use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use analytics::MarketSnapshot;
use history::model::{PersistedDay, SessionCandle};
use history::store::HistoryStore;

pub type CandleMap = std::collections::HashMap<String, Vec<SessionCandle>>;

/// In-memory HistoryStore double. `fail_writes` lets tests exercise
/// the swallow-and-log persistence failure path.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    pub state: Arc<Mutex<PersistedDay>>,
    pub fail_writes: AtomicBool,
}

impl InMemoryHistoryStore {
    pub fn with_day(day: &str, snapshots: Vec<MarketSnapshot>, candles: CandleMap) -> Self {
        Self {
            state: Arc::new(Mutex::new(PersistedDay {
                day: Some(day.to_string()),
                snapshots,
                candles,
            })),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check_writes(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated storage failure");
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self) -> anyhow::Result<PersistedDay> {
        Ok(self.state.lock().await.clone())
    }

    async fn save_day_marker(&self, day: &str) -> anyhow::Result<()> {
        self.check_writes()?;
        self.state.lock().await.day = Some(day.to_string());
        Ok(())
    }

    async fn save_snapshots(&self, _day: &str, log: &[MarketSnapshot]) -> anyhow::Result<()> {
        self.check_writes()?;
        self.state.lock().await.snapshots = log.to_vec();
        Ok(())
    }

    async fn save_candles(
        &self,
        _day: &str,
        security_id: &str,
        candles: &[SessionCandle],
    ) -> anyhow::Result<()> {
        self.check_writes()?;
        self.state
            .lock()
            .await
            .candles
            .insert(security_id.to_string(), candles.to_vec());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.check_writes()?;
        *self.state.lock().await = PersistedDay::default();
        Ok(())
    }
}
