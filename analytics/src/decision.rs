//! Decision Engine
//!
//! Turns the snapshot log plus a user-selected lookback window into a
//! discrete trading signal.
//!
//! ## Window selection
//! Linear backward scan from the second-to-last snapshot for the
//! first entry whose age ≥ the requested window. When the window is
//! longer than the available history, the scan falls back to the
//! oldest entry and the result reports the *effective* (shorter)
//! duration actually used — the fallback is explicit, never silently
//! presented as the requested window.
//!
//! ## Divergence override
//! Price and option flow disagreeing in direction and magnitude is a
//! higher-priority signal than raw momentum: it overrides whatever
//! bucket the composite score landed in.

use std::fmt;
use std::str::FromStr;

use crate::snapshot::MarketSnapshot;

const STRONG_THRESHOLD: f64 = 40.0;
const TREND_THRESHOLD: f64 = 15.0;
const COMPONENT_CLAMP: f64 = 50.0;

const DIVERGENCE_PRICE_PTS: f64 = 5.0;
const DIVERGENCE_FLOW_QTY: f64 = 50_000.0;

/// Classified prediction bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    StrongBuy,
    Bullish,
    Neutral,
    Bearish,
    StrongSell,
    /// Price and option flow disagree; don't trust either direction.
    TrapDivergence,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::StrongBuy => "STRONG BUY",
            Signal::Bullish => "BULLISH",
            Signal::Neutral => "NEUTRAL",
            Signal::Bearish => "BEARISH",
            Signal::StrongSell => "STRONG SELL",
            Signal::TrapDivergence => "TRAP/DIVERGENCE",
        };
        f.write_str(s)
    }
}

impl FromStr for Signal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG BUY" => Ok(Signal::StrongBuy),
            "BULLISH" => Ok(Signal::Bullish),
            "NEUTRAL" => Ok(Signal::Neutral),
            "BEARISH" => Ok(Signal::Bearish),
            "STRONG SELL" => Ok(Signal::StrongSell),
            "TRAP/DIVERGENCE" => Ok(Signal::TrapDivergence),
            other => Err(anyhow::anyhow!("Invalid Signal value: {}", other)),
        }
    }
}

/// One decision over a lookback window.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub signal: Signal,
    pub score: f64,

    /// Index points moved over the window.
    pub price_delta: f64,
    /// Net option flow added over the window.
    pub flow_delta: f64,
    /// Current breadth minus its mean over the window.
    pub sentiment_trend: f64,

    /// Minutes actually covered between the selected past snapshot
    /// and now.
    pub effective_window_min: f64,
    /// True when the requested window exceeded available history and
    /// the oldest snapshot was used instead.
    pub used_fallback: bool,
}

/// (calls buy - calls sell) - (puts buy - puts sell), all session
/// deltas.
fn net_option_flow(s: &MarketSnapshot) -> f64 {
    (s.calls_buy_qty - s.calls_sell_qty) - (s.puts_buy_qty - s.puts_sell_qty)
}

/// Run the windowed composite scoring over the snapshot log.
///
/// Returns `None` when fewer than 2 snapshots exist — there is no
/// window to measure across yet.
pub fn decide(history: &[MarketSnapshot], window_minutes: u32) -> Option<Decision> {
    if history.len() < 2 {
        return None;
    }

    let current = history.last()?;
    let window_ms = u64::from(window_minutes) * 60_000;

    // Backward scan from the second-to-last entry: first snapshot old
    // enough to cover the window.
    let mut past_idx = None;
    for idx in (0..history.len() - 1).rev() {
        if current.ts_ms.saturating_sub(history[idx].ts_ms) >= window_ms {
            past_idx = Some(idx);
            break;
        }
    }

    let used_fallback = past_idx.is_none();
    let past_idx = past_idx.unwrap_or(0);
    let past = &history[past_idx];

    let effective_window_min = current.ts_ms.saturating_sub(past.ts_ms) as f64 / 60_000.0;

    let price_delta = current.index_ltp - past.index_ltp;
    let flow_delta = net_option_flow(current) - net_option_flow(past);

    let window_slice = &history[past_idx..];
    let mean_sentiment = window_slice
        .iter()
        .map(|s| s.overall_sentiment)
        .sum::<f64>()
        / window_slice.len() as f64;
    let sentiment_trend = current.overall_sentiment - mean_sentiment;

    let breadth_scalar = if sentiment_trend > 0.0 {
        1.2
    } else if sentiment_trend < 0.0 {
        0.8
    } else {
        1.0
    };

    let price_component = (price_delta * 2.0).clamp(-COMPONENT_CLAMP, COMPONENT_CLAMP);
    let flow_component =
        (flow_delta / 100_000.0 * 2.0).clamp(-COMPONENT_CLAMP, COMPONENT_CLAMP);
    let score = (price_component + flow_component) * breadth_scalar;

    let signal = if is_divergent(price_delta, flow_delta) {
        Signal::TrapDivergence
    } else {
        classify(score)
    };

    Some(Decision {
        signal,
        score,
        price_delta,
        flow_delta,
        sentiment_trend,
        effective_window_min,
        used_fallback,
    })
}

/// Price up while flow drains out (or the mirror image) marks a trap.
fn is_divergent(price_delta: f64, flow_delta: f64) -> bool {
    (price_delta > DIVERGENCE_PRICE_PTS && flow_delta < -DIVERGENCE_FLOW_QTY)
        || (price_delta < -DIVERGENCE_PRICE_PTS && flow_delta > DIVERGENCE_FLOW_QTY)
}

fn classify(score: f64) -> Signal {
    if score > STRONG_THRESHOLD {
        Signal::StrongBuy
    } else if score > TREND_THRESHOLD {
        Signal::Bullish
    } else if score < -STRONG_THRESHOLD {
        Signal::StrongSell
    } else if score < -TREND_THRESHOLD {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ts_ms: u64, index_ltp: f64, overall: f64, net_flow: f64) -> MarketSnapshot {
        MarketSnapshot {
            time: "10:00:00".into(),
            ts_ms,
            index_ltp,
            index_change: 0.0,
            overall_sentiment: overall,
            advances: 0,
            declines: 0,
            stock_sentiment: 0.0,
            call_sentiment: 0.0,
            put_sentiment: 0.0,
            pcr: 0.0,
            options_sentiment: 0.0,
            // Fold the desired net flow into the call-buy leg.
            calls_buy_qty: net_flow,
            calls_sell_qty: 0.0,
            puts_buy_qty: 0.0,
            puts_sell_qty: 0.0,
        }
    }

    fn min(n: u64) -> u64 {
        n * 60_000
    }

    #[test]
    fn too_little_history_yields_none() {
        assert!(decide(&[], 15).is_none());
        assert!(decide(&[snapshot(0, 24_600.0, 0.0, 0.0)], 15).is_none());
    }

    #[test]
    fn picks_first_snapshot_old_enough() {
        let history = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(10), 24_550.0, 0.0, 0.0),
            snapshot(min(16), 24_590.0, 0.0, 0.0),
            snapshot(min(20), 24_600.0, 0.0, 0.0),
        ];

        let d = decide(&history, 5).unwrap();

        // Scan from t=16 backward: the t=10 entry is the first with
        // age >= 5 min; t=16 (age 4) is too young.
        assert!(!d.used_fallback);
        assert!((d.effective_window_min - 10.0).abs() < 1e-9);
        assert!((d.price_delta - 50.0).abs() < 1e-9);
    }

    #[test]
    fn window_longer_than_history_falls_back_to_oldest() {
        let history = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(3), 24_520.0, 0.0, 0.0),
        ];

        let d = decide(&history, 30).unwrap();

        assert!(d.used_fallback);
        // Effective duration is the 3 minutes actually covered.
        assert!((d.effective_window_min - 3.0).abs() < 1e-9);
        assert!((d.price_delta - 20.0).abs() < 1e-9);
    }

    #[test]
    fn divergence_overrides_any_score_bucket() {
        // Price +10 pts, flow -80k: the raw score would be a buy
        // bucket, the divergence rule must win.
        let history = vec![
            snapshot(min(0), 24_500.0, 0.0, 80_000.0),
            snapshot(min(10), 24_510.0, 0.0, 0.0),
        ];

        let d = decide(&history, 5).unwrap();

        assert!((d.price_delta - 10.0).abs() < 1e-9);
        assert!((d.flow_delta + 80_000.0).abs() < 1e-9);
        assert_eq!(d.signal, Signal::TrapDivergence);
    }

    #[test]
    fn mirrored_divergence_also_trips() {
        let history = vec![
            snapshot(min(0), 24_510.0, 0.0, 0.0),
            snapshot(min(10), 24_500.0, 0.0, 80_000.0),
        ];

        let d = decide(&history, 5).unwrap();
        assert_eq!(d.signal, Signal::TrapDivergence);
    }

    #[test]
    fn strong_rally_with_inflow_classifies_strong_buy() {
        // +30 pts price (clamped to 50) + strong inflow, rising
        // breadth scales by 1.2.
        let history = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(10), 24_530.0, 20.0, 900_000.0),
        ];

        let d = decide(&history, 5).unwrap();

        // price component 50 (clamped), flow component 18, * 1.2
        assert!((d.score - 81.6).abs() < 1e-6);
        assert_eq!(d.signal, Signal::StrongBuy);
    }

    #[test]
    fn falling_breadth_dampens_the_score() {
        let rising = vec![
            snapshot(min(0), 24_500.0, 10.0, 0.0),
            snapshot(min(10), 24_510.0, 30.0, 0.0),
        ];
        let falling = vec![
            snapshot(min(0), 24_500.0, 30.0, 0.0),
            snapshot(min(10), 24_510.0, 10.0, 0.0),
        ];

        let up = decide(&rising, 5).unwrap();
        let down = decide(&falling, 5).unwrap();

        assert!(up.sentiment_trend > 0.0);
        assert!(down.sentiment_trend < 0.0);
        // Same deltas, different scalars: 20*1.2 vs 20*0.8.
        assert!((up.score - 24.0).abs() < 1e-9);
        assert!((down.score - 16.0).abs() < 1e-9);
        assert_eq!(up.signal, Signal::Bullish);
        assert_eq!(down.signal, Signal::Bullish);
    }

    #[test]
    fn small_moves_stay_neutral() {
        let history = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(10), 24_503.0, 0.0, 10_000.0),
        ];

        let d = decide(&history, 5).unwrap();
        assert_eq!(d.signal, Signal::Neutral);
    }

    #[test]
    fn sell_buckets_mirror_buy_buckets() {
        let bearish = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(10), 24_490.0, 0.0, 0.0),
        ];
        let strong_sell = vec![
            snapshot(min(0), 24_500.0, 0.0, 0.0),
            snapshot(min(10), 24_460.0, 0.0, 0.0),
        ];

        assert_eq!(decide(&bearish, 5).unwrap().signal, Signal::Bearish);
        assert_eq!(decide(&strong_sell, 5).unwrap().signal, Signal::StrongSell);
    }

    #[test]
    fn signal_labels_round_trip() {
        for sig in [
            Signal::StrongBuy,
            Signal::Bullish,
            Signal::Neutral,
            Signal::Bearish,
            Signal::StrongSell,
            Signal::TrapDivergence,
        ] {
            assert_eq!(sig.to_string().parse::<Signal>().unwrap(), sig);
        }
    }
}
