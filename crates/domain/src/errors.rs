//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::MAX_SYNC_ERROR_LENGTH;
use crate::types::booking::BookingStatus;

/// Main error type for HiveDesk
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HiveDeskError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// State machine misuse; rejected, never retried.
    #[error("invalid booking transition: {from} -> {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    /// Another sync run holds the per-space lock; callers should skip.
    #[error("sync already in progress for space {0}")]
    SyncInProgress(Uuid),

    /// Caller bug in nearby-space search input; fail fast.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Result type alias for HiveDesk operations
pub type Result<T> = std::result::Result<T, HiveDeskError>;

/// Per-URL calendar feed failure.
///
/// Feed failures are isolated to the URL that produced them: one failing
/// import URL never aborts the rest of a space's sync run. The sync
/// orchestrator folds these into `SpaceCalendarSettings::last_sync_error`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FeedError {
    #[error("feed unreachable: {0}")]
    Unreachable(String),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("feed exceeds size limit of {limit_bytes} bytes")]
    TooLarge { limit_bytes: u64 },
}

/// Truncate diagnostic text to the bounded storage length.
///
/// `last_sync_error` has a fixed storage budget; anything longer is cut at a
/// char boundary with a trailing ellipsis.
pub fn truncate_diagnostic(text: &str) -> String {
    if text.len() <= MAX_SYNC_ERROR_LENGTH {
        return text.to_string();
    }

    let mut cut = MAX_SYNC_ERROR_LENGTH.saturating_sub(3);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}
