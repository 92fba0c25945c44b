//! Calendar sync orchestration: feed import port and the per-space sync run

pub mod ports;
pub mod service;

pub use ports::FeedImporter;
pub use service::{SyncService, SyncSweepReport};
