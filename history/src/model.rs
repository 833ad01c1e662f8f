use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use analytics::MarketSnapshot;
use market::enrich::BaselineSeed;
use market::types::EnrichedQuote;

/// One per-instrument chart point per poll, used for sparkline/detail
/// views. At most one candle exists per distinct time label per
/// instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCandle {
    /// Feed time label; the dedupe key within an instrument.
    pub time: String,
    pub ts_ms: u64,

    pub ltp: f64,
    /// Cumulative traded interest proxy (buy_qty + sell_qty).
    pub volume: f64,

    pub day_pct: Option<f64>,
    pub min_pct: Option<f64>,

    pub buy_qty: f64,
    pub sell_qty: f64,
    pub buy_delta: Option<f64>,
    pub sell_delta: Option<f64>,

    pub net_strength_1m: Option<f64>,
    pub net_strength_day: Option<f64>,
}

impl SessionCandle {
    pub fn from_enriched(q: &EnrichedQuote, ts_ms: u64) -> Self {
        Self {
            time: q.raw.last_update.clone(),
            ts_ms,
            ltp: q.raw.ltp,
            volume: q.raw.buy_qty + q.raw.sell_qty,
            day_pct: q.momentum_day_pct,
            min_pct: q.momentum_1m_pct,
            buy_qty: q.raw.buy_qty,
            sell_qty: q.raw.sell_qty,
            buy_delta: q.bid_qty_delta_1m,
            sell_delta: q.ask_qty_delta_1m,
            net_strength_1m: q.net_strength_1m,
            net_strength_day: q.net_strength_day,
        }
    }

    /// Opening values recovered from a first-of-day candle, used to
    /// re-seed the enricher's baseline after a restart.
    pub fn as_seed(&self) -> BaselineSeed {
        BaselineSeed {
            price: self.ltp,
            buy_qty: self.buy_qty,
            sell_qty: self.sell_qty,
        }
    }
}

/// Everything the store holds for the persisted trading day.
#[derive(Debug, Default, Clone)]
pub struct PersistedDay {
    /// Day marker, `None` on a fresh store.
    pub day: Option<String>,
    pub snapshots: Vec<MarketSnapshot>,
    pub candles: HashMap<String, Vec<SessionCandle>>,
}

/// Current calendar date in exchange-local time, `YYYY-MM-DD`.
pub fn today_key() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Has the trading day rolled over since `stored` was written?
///
/// An explicit two-argument predicate (no wall-clock read) so
/// rollover is testable in isolation. A missing marker counts as a
/// new day.
pub fn is_new_day(stored: Option<&str>, today: &str) -> bool {
    stored != Some(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_marker_is_a_new_day() {
        assert!(is_new_day(None, "2026-08-31"));
    }

    #[test]
    fn same_date_is_not_a_new_day() {
        assert!(!is_new_day(Some("2026-08-31"), "2026-08-31"));
    }

    #[test]
    fn different_date_is_a_new_day() {
        assert!(is_new_day(Some("2026-08-28"), "2026-08-31"));
    }
}
