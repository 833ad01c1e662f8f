use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use analytics::MarketSnapshot;
use history::model::{PersistedDay, SessionCandle};
use history::store::HistoryStore;
use market::source::{QuoteSource, SourceError};
use market::types::{Credentials, RawQuote};

/// Quote-source double backed by a mutable id → quote map.
#[derive(Default)]
pub struct MockQuoteSource {
    pub quotes: Mutex<HashMap<String, RawQuote>>,
    pub fail: AtomicBool,
    /// Per-fetch artificial latency in ms, for overlap tests.
    pub delay_ms: AtomicU64,
}

impl MockQuoteSource {
    pub async fn set_quote(&self, quote: RawQuote) {
        self.quotes
            .lock()
            .await
            .insert(quote.security_id.clone(), quote);
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn fetch_quotes(
        &self,
        security_ids: &[String],
        _credentials: &Credentials,
    ) -> Result<Vec<RawQuote>, SourceError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Network("mock feed outage".into()));
        }

        let map = self.quotes.lock().await;
        Ok(security_ids
            .iter()
            .filter_map(|id| map.get(id).cloned())
            .collect())
    }

    async fn fetch_option_symbols(&self, _index_price: f64) -> Result<Vec<String>, SourceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Network("mock feed outage".into()));
        }

        let map = self.quotes.lock().await;
        let mut symbols: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with("NIFTY2") && (k.ends_with("CE") || k.ends_with("PE")))
            .cloned()
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// In-memory HistoryStore double.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    pub state: Arc<Mutex<PersistedDay>>,
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self) -> anyhow::Result<PersistedDay> {
        Ok(self.state.lock().await.clone())
    }

    async fn save_day_marker(&self, day: &str) -> anyhow::Result<()> {
        self.state.lock().await.day = Some(day.to_string());
        Ok(())
    }

    async fn save_snapshots(&self, _day: &str, log: &[MarketSnapshot]) -> anyhow::Result<()> {
        self.state.lock().await.snapshots = log.to_vec();
        Ok(())
    }

    async fn save_candles(
        &self,
        _day: &str,
        security_id: &str,
        candles: &[SessionCandle],
    ) -> anyhow::Result<()> {
        self.state
            .lock()
            .await
            .candles
            .insert(security_id.to_string(), candles.to_vec());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.state.lock().await = PersistedDay::default();
        Ok(())
    }
}
