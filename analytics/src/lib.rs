pub mod decision;
pub mod snapshot;

pub use decision::{Decision, Signal, decide};
pub use snapshot::{MarketSnapshot, aggregate};
