//! Quote Enricher
//!
//! Turns each raw poll snapshot into an [`EnrichedQuote`] with
//! momentum and session-relative demand metrics.
//!
//! ## State model
//! Two per-instrument maps, both owned by [`SessionMaps`]:
//! - `previous` — last poll's raw quote, overwritten every poll.
//!   Feeds the 1-minute deltas.
//! - `baseline` — first-observed-this-day state, set once per trading
//!   day. Feeds all "day" deltas. When a persisted seed exists for
//!   the instrument (first session candle of the day), the baseline
//!   is built from the seed instead of the current quote, so a
//!   mid-session restart does not reset "day" metrics to the restart
//!   moment. On the poll that creates a baseline from the current
//!   quote itself, the day fields stay `None`; they become defined
//!   from the next poll onward.
//!
//! ## Safety rules
//! Every percentage guards its denominator: a zero or non-finite
//! input leaves the output field `None` — never NaN, never Infinity,
//! never silently 0. Bad upstream data produces partial enrichment,
//! not a crashed pipeline; `enrich` cannot fail.

use std::collections::HashMap;

use crate::types::{EnrichedQuote, InstrumentKind, RawQuote};
use crate::weights;

/// Opening values recovered from the first persisted session candle
/// of an instrument, used to rebuild a baseline after a restart.
#[derive(Debug, Clone, Copy)]
pub struct BaselineSeed {
    pub price: f64,
    pub buy_qty: f64,
    pub sell_qty: f64,
}

/// Per-instrument previous/baseline state for one trading day.
///
/// Owned by the poll engine and cleared wholesale on day rollover;
/// the enricher is the only writer.
#[derive(Debug, Default)]
pub struct SessionMaps {
    previous: HashMap<String, RawQuote>,
    baseline: HashMap<String, RawQuote>,
}

impl SessionMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Day rollover: drop all per-instrument state.
    pub fn clear(&mut self) {
        self.previous.clear();
        self.baseline.clear();
    }
}

/// Percentage change of `now` vs `base`, or `None` when the division
/// is not meaningful.
fn pct_change(now: f64, base: f64) -> Option<f64> {
    if !now.is_finite() || !base.is_finite() || base == 0.0 {
        return None;
    }
    Some((now - base) / base * 100.0)
}

/// Plain difference, guarded against non-finite inputs.
fn diff(now: f64, then: f64) -> Option<f64> {
    if !now.is_finite() || !then.is_finite() {
        return None;
    }
    Some(now - then)
}

/// bid% - ask%; defined only when both operands are.
fn net_strength(bid_pct: Option<f64>, ask_pct: Option<f64>) -> Option<f64> {
    Some(bid_pct? - ask_pct?)
}

/// Enrich one poll's raw quotes against the session state.
///
/// Mutations performed, in order, per quote:
///   1. Baseline creation if the instrument has none yet (seed
///      preferred over the current quote).
///   2. `previous` overwritten with the current raw quote — the only
///      shared-state write, and the last step so this poll's 1-minute
///      deltas still see last poll's values.
pub fn enrich(
    raw: &[RawQuote],
    maps: &mut SessionMaps,
    seeds: &HashMap<String, BaselineSeed>,
    kind: InstrumentKind,
) -> Vec<EnrichedQuote> {
    raw.iter()
        .map(|quote| {
            let day_defined = ensure_baseline(maps, seeds, quote);

            let enriched = enrich_one(quote, maps, kind, day_defined);

            maps.previous
                .insert(quote.security_id.clone(), quote.clone());

            enriched
        })
        .collect()
}

/// Returns whether the baseline carries real opening state: `true`
/// when it pre-existed or was rebuilt from a persisted seed, `false`
/// when it was just created from the current quote (in which case the
/// day deltas have nothing to measure against yet).
fn ensure_baseline(
    maps: &mut SessionMaps,
    seeds: &HashMap<String, BaselineSeed>,
    quote: &RawQuote,
) -> bool {
    if maps.baseline.contains_key(&quote.security_id) {
        return true;
    }

    let mut baseline = quote.clone();
    let seeded = match seeds.get(&quote.security_id) {
        Some(seed) => {
            baseline.ltp = seed.price;
            baseline.buy_qty = seed.buy_qty;
            baseline.sell_qty = seed.sell_qty;
            true
        }
        None => false,
    };

    maps.baseline.insert(quote.security_id.clone(), baseline);
    seeded
}

fn enrich_one(
    quote: &RawQuote,
    maps: &SessionMaps,
    kind: InstrumentKind,
    day_defined: bool,
) -> EnrichedQuote {
    let previous = maps.previous.get(&quote.security_id);
    // A baseline cloned from the current quote on this very poll
    // would make every day delta a vacuous 0; treat it as absent.
    let baseline = maps
        .baseline
        .get(&quote.security_id)
        .filter(|_| day_defined);

    // 1-minute deltas: only when a previous-poll entry exists.
    let momentum_1m_pct = previous.and_then(|p| pct_change(quote.ltp, p.ltp));
    let bid_qty_delta_1m = previous.and_then(|p| diff(quote.buy_qty, p.buy_qty));
    let bid_qty_pct_1m = previous.and_then(|p| pct_change(quote.buy_qty, p.buy_qty));
    let ask_qty_delta_1m = previous.and_then(|p| diff(quote.sell_qty, p.sell_qty));
    let ask_qty_pct_1m = previous.and_then(|p| pct_change(quote.sell_qty, p.sell_qty));

    // Day deltas: relative to the session baseline.
    let momentum_day_pct = baseline.and_then(|b| pct_change(quote.ltp, b.ltp));
    let bid_qty_pct_day = baseline.and_then(|b| pct_change(quote.buy_qty, b.buy_qty));
    let ask_qty_pct_day = baseline.and_then(|b| pct_change(quote.sell_qty, b.sell_qty));

    let (weight, index_contribution) = match kind {
        InstrumentKind::Equity => {
            let w = weights::weight_for(&quote.symbol);
            // Unknown day% contributes 0 to the index, not "unknown":
            // the per-cycle index sum must stay summable.
            (Some(w), Some(momentum_day_pct.unwrap_or(0.0) * w))
        }
        InstrumentKind::Option => (None, None),
    };

    EnrichedQuote {
        raw: quote.clone(),

        momentum_1m_pct,
        momentum_day_pct,

        bid_qty_delta_1m,
        bid_qty_pct_1m,
        ask_qty_delta_1m,
        ask_qty_pct_1m,
        net_strength_1m: net_strength(bid_qty_pct_1m, ask_qty_pct_1m),

        bid_qty_pct_day,
        ask_qty_pct_day,
        net_strength_day: net_strength(bid_qty_pct_day, ask_qty_pct_day),

        baseline_buy_qty: baseline.map(|b| b.buy_qty),
        baseline_sell_qty: baseline.map(|b| b.sell_qty),

        weight,
        index_contribution,
    }
}
