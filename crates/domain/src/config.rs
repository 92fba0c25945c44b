//! Configuration structures
//!
//! Plain data definitions; loading from the environment or files lives in
//! the infrastructure crate.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FEED_TIMEOUT_SECS, DEFAULT_MAX_FEED_BYTES, DEFAULT_NO_SHOW_GRACE_MINUTES,
    DEFAULT_PENDING_TIMEOUT_MINUTES, DEFAULT_STALE_LOCK_SECS, DEFAULT_SYNC_CRON,
};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub booking: BookingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "hivedesk.db".into(), pool_size: 4 }
    }
}

/// Calendar sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Whether the recurring sync sweep runs at all.
    pub enabled: bool,
    /// Cron expression for the recurring sweep.
    pub cron_expression: String,
    /// Per-fetch timeout for one import URL.
    pub feed_timeout_secs: u64,
    /// Upper bound on a single feed document.
    pub max_feed_bytes: u64,
    /// Age after which a wedged `InProgress` lock is treated as failed.
    pub stale_lock_secs: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: DEFAULT_SYNC_CRON.into(),
            feed_timeout_secs: DEFAULT_FEED_TIMEOUT_SECS,
            max_feed_bytes: DEFAULT_MAX_FEED_BYTES,
            stale_lock_secs: DEFAULT_STALE_LOCK_SECS,
        }
    }
}

/// Booking lifecycle policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Minutes a `Pending` booking may wait for confirmation before the
    /// abandonment sweep picks it up.
    pub pending_timeout_minutes: i64,
    /// Minutes past interval start before a no-show may be recorded.
    pub no_show_grace_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            pending_timeout_minutes: DEFAULT_PENDING_TIMEOUT_MINUTES,
            no_show_grace_minutes: DEFAULT_NO_SHOW_GRACE_MINUTES,
        }
    }
}
