//! Common data types used throughout the application

pub mod booking;
pub mod interval;
pub mod sync;

pub use booking::{Booking, BookingSource, BookingStatus, BookingTransition};
pub use interval::TimeInterval;
pub use sync::{ExternalEvent, SpaceCalendarSettings, SyncReport, SyncRunStatus};
