//! Shared types used by the poll engine.

use std::time::Duration;

use tokio::sync::mpsc::Sender;

use analytics::MarketSnapshot;
use market::source::SourceError;
use market::types::{Credentials, EnrichedQuote};

/// Configuration knobs for the poll engine.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Spacing between poll cycles.
    pub interval: Duration,

    /// Default lookback window handed to the decision engine.
    pub window_minutes: u32,

    /// Skip the market-hours gate (off-hours testing against a mock
    /// feed).
    pub bypass_market_hours: bool,

    /// Equity basket security ids, fetched every cycle.
    pub equity_ids: Vec<String>,

    /// Security id of the index instrument.
    pub index_id: String,

    pub credentials: Credentials,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            window_minutes: 15,
            bypass_market_hours: false,
            equity_ids: Vec::new(),
            index_id: "NIFTY".to_string(),
            credentials: Credentials::default(),
        }
    }
}

/// Why a poll cycle produced no snapshot.
///
/// Only `Fetch` is surfaced to the user (transient banner); the
/// others are normal gating outcomes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] SourceError),

    #[error("market closed, cycle skipped")]
    MarketClosed,

    #[error("previous poll cycle still in flight, tick dropped")]
    CycleInFlight,

    #[error("quote feed returned no data for the index instrument")]
    MissingIndexQuote,
}

/// Convenience alias for snapshot subscribers (presentation layer,
/// LLM advisory layer).
pub type SnapshotSender = Sender<MarketSnapshot>;

/// Latest published per-cycle state, read by consumers by value.
#[derive(Debug, Default, Clone)]
pub struct EngineOutput {
    pub equities: Vec<EnrichedQuote>,
    pub options: Vec<EnrichedQuote>,
    pub latest_snapshot: Option<MarketSnapshot>,
}
