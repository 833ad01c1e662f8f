use serde::{Deserialize, Serialize};

/// Which half of the basket a quote belongs to.
///
/// Equities feed the weighted breadth calculations; options (CE/PE
/// strikes around the index) feed the flow/PCR calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Equity,
    Option,
}

/// Credentials handed to the quote source on every fetch.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub access_token: String,
}

/// One instrument's point-in-time market state, exactly as received
/// from the upstream feed. Immutable once received; superseded every
/// poll.
///
/// `buy_qty`/`sell_qty` are *cumulative* session totals, not per-tick
/// volumes. `oi` is only present for derivatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuote {
    pub security_id: String,
    pub symbol: String,

    pub ltp: f64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,

    pub net_change: f64,
    pub pct_change: f64,

    pub buy_qty: f64,
    pub sell_qty: f64,

    pub oi: Option<f64>,

    /// Feed-provided last-update label, second resolution.
    pub last_update: String,
}

impl RawQuote {
    /// Options are identified by the CE/PE suffix of the trading symbol.
    pub fn is_call(&self) -> bool {
        self.symbol.ends_with("CE")
    }

    pub fn is_put(&self) -> bool {
        self.symbol.ends_with("PE")
    }
}

/// A raw quote plus everything derived from previous-poll and
/// session-baseline state.
///
/// Every derived field is `None` when its inputs are unavailable
/// (first poll of the day, missing previous entry, zero denominator).
/// Consumers must treat "unknown" and "zero" as distinct — derived
/// values are never coerced to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedQuote {
    #[serde(flatten)]
    pub raw: RawQuote,

    /// Price % change vs the previous poll.
    pub momentum_1m_pct: Option<f64>,
    /// Price % change vs the session baseline.
    pub momentum_day_pct: Option<f64>,

    pub bid_qty_delta_1m: Option<f64>,
    pub bid_qty_pct_1m: Option<f64>,
    pub ask_qty_delta_1m: Option<f64>,
    pub ask_qty_pct_1m: Option<f64>,
    /// bid_qty_pct_1m - ask_qty_pct_1m; requires both operands.
    pub net_strength_1m: Option<f64>,

    pub bid_qty_pct_day: Option<f64>,
    pub ask_qty_pct_day: Option<f64>,
    pub net_strength_day: Option<f64>,

    /// Session-baseline cumulative quantities, carried so the
    /// aggregator's option pass can compute session deltas without
    /// reaching back into the baseline map.
    pub baseline_buy_qty: Option<f64>,
    pub baseline_sell_qty: Option<f64>,

    /// Index weight from the weight table (equities only).
    pub weight: Option<f64>,
    /// momentum_day_pct * weight, with an unknown day% contributing
    /// 0 rather than unknown (equities only).
    pub index_contribution: Option<f64>,
}
