pub mod logger;

pub use logger::{CycleId, init_logger};
