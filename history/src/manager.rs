//! HistoryManager
//!
//! Owns the two bounded, persisted sequences of the trading day:
//!   • the snapshot log (one entry per poll, FIFO-capped)
//!   • the per-instrument session-candle map (FIFO-capped per
//!     instrument, at most one candle per distinct time label)
//!
//! In-memory state is authoritative; the store is written through on
//! every append. A persistence failure is logged and swallowed —
//! losing history is recoverable, crashing the poll loop is not.
//! Past entries are never mutated; eviction is strict oldest-first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use analytics::MarketSnapshot;
use market::enrich::BaselineSeed;

use crate::model::{PersistedDay, SessionCandle, is_new_day};
use crate::store::HistoryStore;

/// Buffer capacities. Defaults sized for a full session at the
/// fastest poll interval.
#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    pub snapshot_capacity: usize,
    /// Per-instrument candle cap.
    pub candle_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            snapshot_capacity: 400,
            candle_capacity: 400,
        }
    }
}

pub struct HistoryManager<S: HistoryStore> {
    store: Arc<S>,
    cfg: HistoryConfig,
    day: String,

    snapshots: Mutex<VecDeque<MarketSnapshot>>,
    candles: Mutex<HashMap<String, VecDeque<SessionCandle>>>,
}

impl<S: HistoryStore> HistoryManager<S> {
    /// Initialize for `today`, restoring the persisted day or
    /// resetting it if the stored marker belongs to a previous date.
    ///
    /// The rollover check is idempotent: running it again on the same
    /// day restores instead of clearing.
    pub async fn new(store: Arc<S>, cfg: HistoryConfig, today: &str) -> Self {
        let persisted = match store.load().await {
            Ok(p) => p,
            Err(e) => {
                // A broken store must not block the poll loop; run
                // with in-memory state only.
                tracing::warn!(error = %e, "history load failed, starting empty");
                PersistedDay::default()
            }
        };

        let manager = Self {
            store,
            cfg,
            day: today.to_string(),
            snapshots: Mutex::new(VecDeque::new()),
            candles: Mutex::new(HashMap::new()),
        };

        if is_new_day(persisted.day.as_deref(), today) {
            // Discard both stores and rewrite the marker before any
            // append happens this session.
            if let Err(e) = manager.store.clear().await {
                tracing::warn!(error = %e, "history clear on rollover failed");
            }
            if let Err(e) = manager.store.save_day_marker(today).await {
                tracing::warn!(error = %e, "day marker write failed");
            }
            return manager;
        }

        {
            let mut log = manager.snapshots.lock().await;
            *log = persisted.snapshots.into_iter().collect();
            while log.len() > manager.cfg.snapshot_capacity {
                log.pop_front();
            }
        }
        {
            let mut map = manager.candles.lock().await;
            for (id, seq) in persisted.candles {
                let mut dq: VecDeque<_> = seq.into_iter().collect();
                while dq.len() > manager.cfg.candle_capacity {
                    dq.pop_front();
                }
                map.insert(id, dq);
            }
        }

        manager
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    /// Append one snapshot, evicting the oldest entry past capacity.
    pub async fn append_snapshot(&self, snapshot: MarketSnapshot) {
        let mut log = self.snapshots.lock().await;

        log.push_back(snapshot);
        if log.len() > self.cfg.snapshot_capacity {
            log.pop_front();
        }

        let persisted: Vec<_> = log.iter().cloned().collect();
        drop(log);

        if let Err(e) = self.store.save_snapshots(&self.day, &persisted).await {
            tracing::warn!(error = %e, "snapshot log write failed");
        }
    }

    /// Append one candle for an instrument.
    ///
    /// A candle whose time label matches the sequence's last entry is
    /// a no-op (duplicate poll within the same label resolution) —
    /// never an overwrite. Returns whether the candle was appended.
    pub async fn append_candle(&self, security_id: &str, candle: SessionCandle) -> bool {
        let mut map = self.candles.lock().await;
        let seq = map.entry(security_id.to_string()).or_default();

        if seq.back().is_some_and(|last| last.time == candle.time) {
            return false;
        }

        if seq.len() >= self.cfg.candle_capacity {
            seq.pop_front();
        }
        seq.push_back(candle);

        let persisted: Vec<_> = seq.iter().cloned().collect();
        drop(map);

        if let Err(e) = self
            .store
            .save_candles(&self.day, security_id, &persisted)
            .await
        {
            tracing::warn!(security_id, error = %e, "candle write failed");
        }

        true
    }

    /// Full snapshot log, oldest first.
    pub async fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.snapshots.lock().await.iter().cloned().collect()
    }

    /// One instrument's candle sequence, oldest first.
    pub async fn candles_for(&self, security_id: &str) -> Vec<SessionCandle> {
        self.candles
            .lock()
            .await
            .get(security_id)
            .map(|seq| seq.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// First-of-day opening values per instrument, for re-seeding the
    /// enricher baselines after a mid-session restart.
    pub async fn baseline_seeds(&self) -> HashMap<String, BaselineSeed> {
        self.candles
            .lock()
            .await
            .iter()
            .filter_map(|(id, seq)| seq.front().map(|first| (id.clone(), first.as_seed())))
            .collect()
    }
}
