use super::CycleId;
use tracing::{Level, Span};

/// Create a root span for one poll cycle; every stage logs inside it.
pub fn cycle_span(cycle_id: &CycleId) -> Span {
    tracing::span!(
        Level::INFO,
        "poll_cycle",
        cycle_id = %cycle_id.as_string()
    )
}
