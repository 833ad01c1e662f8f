pub mod cycle_id;
pub mod init;
pub mod spans;

pub use cycle_id::CycleId;
pub use init::init_logger;
