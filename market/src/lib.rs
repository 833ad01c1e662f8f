pub mod enrich;
pub mod hours;
pub mod source;
pub mod types;
pub mod weights;
