//! # HiveDesk Domain
//!
//! Business domain types and models for the HiveDesk booking engine.
//!
//! This crate contains:
//! - Domain data types (Booking, TimeInterval, SpaceCalendarSettings, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and pure utility functions
//!
//! ## Architecture
//! - No dependencies on other HiveDesk crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::booking::{Booking, BookingSource, BookingStatus, BookingTransition};
pub use types::interval::TimeInterval;
pub use types::sync::{ExternalEvent, SpaceCalendarSettings, SyncReport, SyncRunStatus};
// Re-export the distance utility used by nearby-space search
pub use utils::geo::{distance_km, within_radius};
