//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Sync bookkeeping
pub const MAX_SYNC_ERROR_LENGTH: usize = 512;
pub const DEFAULT_STALE_LOCK_SECS: i64 = 900;
pub const DEFAULT_SYNC_CRON: &str = "0 */15 * * * *"; // every 15 minutes

// Feed fetching
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FEED_BYTES: u64 = 1024 * 1024;

// Booking lifecycle
pub const DEFAULT_PENDING_TIMEOUT_MINUTES: i64 = 30;
pub const DEFAULT_NO_SHOW_GRACE_MINUTES: i64 = 15;

// Export feed
pub const EXPORT_UID_SUFFIX: &str = "@hivedesk.app";
pub const EXPORT_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

// Geodesy (mean Earth radius, IUGG)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;
