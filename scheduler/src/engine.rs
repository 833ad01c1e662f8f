//! PollEngine
//!
//! This module drives the per-cycle analytics pipeline.
//! Responsibilities:
//!   • Gate each cycle on market hours (with settings bypass)
//!   • Fetch raw equity, index and option quotes in strict sequence
//!   • Enrich quotes against the per-instrument session state
//!   • Aggregate one MarketSnapshot per cycle
//!   • Append snapshot + candles to the history manager
//!   • Publish the latest enriched state and broadcast snapshots to
//!     all subscribed components
//!
//! PollEngine is designed as an Arc-managed async service, ensuring
//! the timer loop may safely capture `self` without lifetime issues.
//! Fetches within a cycle are sequential by design: the per-instrument
//! "previous" state must be overwritten exactly once per cycle, so no
//! two fetch/enrich stages may interleave. An overlapping timer tick
//! is dropped, never run concurrently — a second in-flight cycle
//! would double-apply the "previous" overwrite and corrupt every
//! 1-minute delta.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{Mutex, watch};
use tracing::Instrument;

use analytics::{Decision, MarketSnapshot, aggregate, decide};
use common::CycleId;
use common::logger::spans::cycle_span;
use history::manager::HistoryManager;
use history::model::SessionCandle;
use history::store::HistoryStore;
use market::enrich::{BaselineSeed, SessionMaps, enrich};
use market::hours::market_open;
use market::source::QuoteSource;
use market::types::{EnrichedQuote, InstrumentKind};

use crate::types::{EngineError, EngineOutput, PollConfig, SnapshotSender};

/// State owned exclusively by the pipeline and mutated once per
/// cycle.
struct PipelineState {
    maps: SessionMaps,
    /// Persisted first-of-day openings, consulted on baseline
    /// creation so a restart mid-session keeps the original "day"
    /// reference.
    seeds: HashMap<String, BaselineSeed>,
    prev_index_ltp: Option<f64>,
}

pub struct PollEngine<Q, H: HistoryStore> {
    cfg: PollConfig,
    source: Arc<Q>,
    history: Arc<HistoryManager<H>>,

    state: Mutex<PipelineState>,

    /// Latest published state; consumers read copies, never mutate.
    output: Mutex<EngineOutput>,

    /// Components interested in receiving each new snapshot.
    subscribers: Mutex<Vec<SnapshotSender>>,

    /// Held for the duration of one cycle; `try_lock` failure means a
    /// cycle is already in flight.
    cycle_guard: Mutex<()>,
}

impl<Q: QuoteSource, H: HistoryStore> PollEngine<Q, H> {
    /// Create a new engine wrapped in Arc<Self> for multi-task
    /// ownership. Baseline seeds are read from today's persisted
    /// candles once, up front.
    pub async fn new(
        cfg: PollConfig,
        source: Arc<Q>,
        history: Arc<HistoryManager<H>>,
    ) -> Arc<Self> {
        let seeds = history.baseline_seeds().await;

        Arc::new(Self {
            cfg,
            source,
            history,
            state: Mutex::new(PipelineState {
                maps: SessionMaps::new(),
                seeds,
                prev_index_ltp: None,
            }),
            output: Mutex::new(EngineOutput::default()),
            subscribers: Mutex::new(Vec::new()),
            cycle_guard: Mutex::new(()),
        })
    }

    /// Subscribe a component to every snapshot the engine produces.
    pub async fn subscribe(&self, sender: SnapshotSender) {
        self.subscribers.lock().await.push(sender);
    }

    /// Latest enriched quotes + snapshot, by value.
    pub async fn output(&self) -> EngineOutput {
        self.output.lock().await.clone()
    }

    /// Run the decision engine over the current snapshot log.
    pub async fn decide(&self, window_minutes: u32) -> Option<Decision> {
        let log = self.history.snapshots().await;
        decide(&log, window_minutes)
    }

    /// Drive the recurring poll loop until `shutdown` flips to true.
    ///
    /// One failed cycle never stops the loop: fetch errors are logged
    /// and the next tick retries.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Local::now().naive_local();
                    let cycle_id = CycleId::default();

                    match self.run_cycle(now).instrument(cycle_span(&cycle_id)).await {
                        Ok(snapshot) => {
                            tracing::info!(
                                time = %snapshot.time,
                                index_ltp = snapshot.index_ltp,
                                breadth = snapshot.overall_sentiment,
                                "cycle complete"
                            );

                            if let Some(d) = self.decide(self.cfg.window_minutes).await {
                                tracing::info!(
                                    signal = %d.signal,
                                    score = d.score,
                                    window_min = d.effective_window_min,
                                    fallback = d.used_fallback,
                                    "decision"
                                );
                            }
                        }
                        Err(EngineError::MarketClosed) => {
                            tracing::debug!("market closed, cycle skipped");
                        }
                        Err(EngineError::CycleInFlight) => {
                            tracing::warn!("tick dropped, previous cycle still in flight");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "cycle failed, retrying next tick");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("poll loop stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Execute one full pipeline cycle at `now`.
    ///
    /// Stages run strictly in sequence; the snapshot is only
    /// published after the full aggregation completes, so consumers
    /// never observe partial state.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<MarketSnapshot, EngineError> {
        let Ok(_cycle) = self.cycle_guard.try_lock() else {
            return Err(EngineError::CycleInFlight);
        };

        if !market_open(now, self.cfg.bypass_market_hours) {
            return Err(EngineError::MarketClosed);
        }

        let creds = &self.cfg.credentials;

        // Each fetch may fail per-cycle; nothing below mutates shared
        // state until every fetch for the stage has succeeded.
        let raw_equities = self.source.fetch_quotes(&self.cfg.equity_ids, creds).await?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let equities = enrich(
            &raw_equities,
            &mut state.maps,
            &state.seeds,
            InstrumentKind::Equity,
        );

        let index_quote = self
            .source
            .fetch_quotes(std::slice::from_ref(&self.cfg.index_id), creds)
            .await?
            .into_iter()
            .next()
            .ok_or(EngineError::MissingIndexQuote)?;

        let index_ltp = index_quote.ltp;
        let index_change = state
            .prev_index_ltp
            .map(|prev| index_ltp - prev)
            .unwrap_or(0.0);
        state.prev_index_ltp = Some(index_ltp);

        let option_symbols = self.source.fetch_option_symbols(index_ltp).await?;
        let raw_options = self.source.fetch_quotes(&option_symbols, creds).await?;

        let options = enrich(
            &raw_options,
            &mut state.maps,
            &state.seeds,
            InstrumentKind::Option,
        );

        drop(guard);

        let time = now.format("%H:%M:%S").to_string();
        let ts_ms = now.and_utc().timestamp_millis().max(0) as u64;

        let snapshot = aggregate(&equities, &options, index_ltp, index_change, &time, ts_ms);

        self.history.append_snapshot(snapshot.clone()).await;
        for q in equities.iter().chain(options.iter()) {
            self.history
                .append_candle(&q.raw.security_id, SessionCandle::from_enriched(q, ts_ms))
                .await;
        }

        self.publish(equities, options, &snapshot).await;

        Ok(snapshot)
    }

    async fn publish(
        &self,
        equities: Vec<EnrichedQuote>,
        options: Vec<EnrichedQuote>,
        snapshot: &MarketSnapshot,
    ) {
        {
            let mut out = self.output.lock().await;
            out.equities = equities;
            out.options = options;
            out.latest_snapshot = Some(snapshot.clone());
        }

        let subscribers = self.subscribers.lock().await;
        for ch in subscribers.iter() {
            let _ = ch.send(snapshot.clone()).await;
        }
    }
}
