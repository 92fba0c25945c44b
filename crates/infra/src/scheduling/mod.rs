//! Scheduling infrastructure for the recurring sync sweep
//!
//! The scheduler follows explicit lifecycle rules: join handles are tracked,
//! cancellation is explicit, and every asynchronous operation is wrapped in
//! a timeout.

pub mod error;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
