//! Calendar sync types
//!
//! Per-space sync settings and bookkeeping, plus the transient event shape
//! produced by feed imports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::HiveDeskError;
use crate::types::interval::TimeInterval;

/// Outcome status of a space's most recent sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
    ConflictDetected,
}

impl SyncRunStatus {
    /// Stable storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ConflictDetected => "conflict_detected",
        }
    }
}

impl std::fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncRunStatus {
    type Err = HiveDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "conflict_detected" => Ok(Self::ConflictDetected),
            other => Err(HiveDeskError::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

/// Calendar sync settings and bookkeeping, one row per space.
///
/// Created when an owner enables calendar sync; deleted with the space.
/// The `sync_status`/`last_sync_attempt` pair doubles as the per-space
/// mutual-exclusion lock for sync runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceCalendarSettings {
    pub space_id: Uuid,
    /// Import feeds, in configured order.
    pub import_urls: Vec<String>,
    /// Whether the space publishes its own outbound feed.
    pub export_enabled: bool,
    /// Whether the recurring sweep picks this space up.
    pub sync_enabled: bool,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    /// Last successful run.
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_status: SyncRunStatus,
    /// Bounded diagnostic text from the most recent run.
    pub last_sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpaceCalendarSettings {
    /// Fresh settings for a space that just enabled calendar sync.
    pub fn new(space_id: Uuid, import_urls: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            space_id,
            import_urls,
            export_enabled: true,
            sync_enabled: true,
            last_sync_attempt: None,
            last_sync_time: None,
            sync_status: SyncRunStatus::NotStarted,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Parsed VEVENT from one import URL.
///
/// Transient: exists only during a single sync pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub uid: String,
    pub interval: TimeInterval,
    pub summary: Option<String>,
    pub feed_url: String,
}

/// Aggregate outcome of one sync run for one space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub space_id: Uuid,
    pub status: SyncRunStatus,
    pub urls_attempted: usize,
    pub urls_failed: usize,
    pub events_seen: usize,
    pub inserted: usize,
    pub merged: usize,
    pub flagged: usize,
    pub cancelled_missing: usize,
    pub last_error: Option<String>,
}

impl SyncReport {
    /// Empty report scaffold for a run that is about to start.
    pub fn new(space_id: Uuid, urls_attempted: usize) -> Self {
        Self {
            space_id,
            status: SyncRunStatus::InProgress,
            urls_attempted,
            urls_failed: 0,
            events_seen: 0,
            inserted: 0,
            merged: 0,
            flagged: 0,
            cancelled_missing: 0,
            last_error: None,
        }
    }
}
