pub mod manager;
pub mod model;
pub mod store;

pub use manager::{HistoryConfig, HistoryManager};
pub use model::{PersistedDay, SessionCandle, is_new_day, today_key};
pub use store::HistoryStore;
