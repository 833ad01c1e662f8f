pub mod engine;
pub mod types;

pub use engine::PollEngine;
pub use types::{EngineError, PollConfig};
