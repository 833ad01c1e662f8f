//! Snapshot Aggregator
//!
//! Collapses one poll's enriched equity and option lists into a
//! single [`MarketSnapshot`].
//!
//! ## Equity pass
//! One reduction over the equity list:
//! - classify each instrument bullish/bearish/neutral by its session
//!   % change against a small epsilon (flat price must not flip the
//!   breadth on noise)
//! - weighted breadth `(bull_w - bear_w) / total_w * 100`
//! - weighted average of per-instrument `net_strength_day` (a
//!   weighted average, not a ratio of totals, so small illiquid names
//!   cannot dominate via large percentage swings)
//!
//! ## Option pass
//! One reduction over the option list, split CE/PE by symbol suffix.
//! Per side, cumulative buy/sell quantities and open interest are
//! summed for "now" and for the session baseline; sentiment is
//! `buy_chg% - sell_chg%` against each side's own baseline sum. The
//! four flow fields are session deltas (`now - baseline`), so the
//! history log shows flow added during the day rather than an
//! ever-growing cumulative counter.
//!
//! ## Guarantee
//! Pure given its inputs, and always fully populated: a snapshot —
//! unlike a single quote — must always be chartable, so every guard
//! failure defaults to 0 instead of `None`.

use serde::{Deserialize, Serialize};

use market::types::EnrichedQuote;

/// Session % changes inside ±EPSILON_PCT count as neutral.
const EPSILON_PCT: f64 = 0.001;

/// One aggregate sentiment record per poll cycle. Immutable once
/// appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Wall-clock label (HH:MM:SS) for chart axes.
    pub time: String,
    /// Epoch milliseconds, used by the decision engine's window scan.
    pub ts_ms: u64,

    pub index_ltp: f64,
    /// Index point change over one poll.
    pub index_change: f64,

    /// Weighted bullish/bearish breadth, in [-100, 100].
    pub overall_sentiment: f64,
    pub advances: u32,
    pub declines: u32,

    /// Weighted average of per-equity net demand strength.
    pub stock_sentiment: f64,

    pub call_sentiment: f64,
    pub put_sentiment: f64,
    /// Put/call ratio by open interest; 0 when there is no call OI.
    pub pcr: f64,
    /// call_sentiment - put_sentiment.
    pub options_sentiment: f64,

    // Session-delta option flows (now - baseline), per side.
    pub calls_buy_qty: f64,
    pub calls_sell_qty: f64,
    pub puts_buy_qty: f64,
    pub puts_sell_qty: f64,
}

/// Running sums for one option side (calls or puts).
#[derive(Default)]
struct SideTotals {
    buy_now: f64,
    buy_base: f64,
    sell_now: f64,
    sell_base: f64,
    oi: f64,
}

impl SideTotals {
    fn add(&mut self, q: &EnrichedQuote) {
        self.buy_now += q.raw.buy_qty;
        self.sell_now += q.raw.sell_qty;
        // Missing baseline contributes a zero session delta, never a
        // spurious full-cumulative one.
        self.buy_base += q.baseline_buy_qty.unwrap_or(q.raw.buy_qty);
        self.sell_base += q.baseline_sell_qty.unwrap_or(q.raw.sell_qty);
        self.oi += q.raw.oi.unwrap_or(0.0);
    }

    /// buy_chg% - sell_chg%, each side guarded against a zero
    /// baseline.
    fn sentiment(&self) -> f64 {
        let buy_chg = pct_vs_base(self.buy_now, self.buy_base);
        let sell_chg = pct_vs_base(self.sell_now, self.sell_base);
        buy_chg - sell_chg
    }
}

fn pct_vs_base(now: f64, base: f64) -> f64 {
    if base > 0.0 && now.is_finite() {
        (now - base) / base * 100.0
    } else {
        0.0
    }
}

/// Aggregate one poll cycle into a snapshot.
pub fn aggregate(
    equities: &[EnrichedQuote],
    options: &[EnrichedQuote],
    index_ltp: f64,
    index_change: f64,
    time: &str,
    ts_ms: u64,
) -> MarketSnapshot {
    // ---- Equity pass ----
    let mut total_w = 0.0;
    let mut bull_w = 0.0;
    let mut bear_w = 0.0;
    let mut advances = 0u32;
    let mut declines = 0u32;

    let mut strength_sum = 0.0;
    let mut strength_w = 0.0;

    for q in equities {
        let w = q.weight.unwrap_or(market::weights::DEFAULT_WEIGHT);
        total_w += w;

        match q.momentum_day_pct {
            Some(p) if p > EPSILON_PCT => {
                bull_w += w;
                advances += 1;
            }
            Some(p) if p < -EPSILON_PCT => {
                bear_w += w;
                declines += 1;
            }
            // Flat or unknown day% counts as neutral mass.
            _ => {}
        }

        if let Some(ns) = q.net_strength_day {
            strength_sum += ns * w;
            strength_w += w;
        }
    }

    let overall_sentiment = if total_w > 0.0 {
        (bull_w - bear_w) / total_w * 100.0
    } else {
        0.0
    };

    let stock_sentiment = if strength_w > 0.0 {
        strength_sum / strength_w
    } else {
        0.0
    };

    // ---- Option pass ----
    let mut calls = SideTotals::default();
    let mut puts = SideTotals::default();

    for q in options {
        if q.raw.is_call() {
            calls.add(q);
        } else if q.raw.is_put() {
            puts.add(q);
        }
    }

    let call_sentiment = calls.sentiment();
    let put_sentiment = puts.sentiment();

    let pcr = if calls.oi > 0.0 { puts.oi / calls.oi } else { 0.0 };

    MarketSnapshot {
        time: time.to_string(),
        ts_ms,
        index_ltp,
        index_change,
        overall_sentiment,
        advances,
        declines,
        stock_sentiment,
        call_sentiment,
        put_sentiment,
        pcr,
        options_sentiment: call_sentiment - put_sentiment,
        calls_buy_qty: calls.buy_now - calls.buy_base,
        calls_sell_qty: calls.sell_now - calls.sell_base,
        puts_buy_qty: puts.buy_now - puts.buy_base,
        puts_sell_qty: puts.sell_now - puts.sell_base,
    }
}
