//! Booking lifecycle: storage ports and the booking service

pub mod ports;
pub mod service;

pub use ports::{BookingChange, BookingRepository, CalendarSettingsRepository};
pub use service::{BookingRequestOutcome, BookingService};
