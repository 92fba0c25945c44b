//! Port interfaces for booking and sync-settings storage
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hivedesk_domain::{Booking, Result, SpaceCalendarSettings, SyncRunStatus, TimeInterval};
use uuid::Uuid;

/// One write produced by a reconciliation pass.
///
/// A sync run (or a flagged booking request) accumulates these and hands
/// them to [`BookingRepository::apply_changes`] so the whole batch commits
/// in a single transaction.
#[derive(Debug, Clone)]
pub enum BookingChange {
    Insert(Booking),
    Update(Booking),
}

impl BookingChange {
    /// The booking this change carries.
    pub fn booking(&self) -> &Booking {
        match self {
            Self::Insert(b) | Self::Update(b) => b,
        }
    }
}

/// Trait for persisting bookings.
///
/// Bookings are never physically deleted; lifecycle exits are status
/// transitions written through `update`/`apply_changes`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a freshly created booking.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Persist a mutated booking (status transition or external merge).
    async fn update(&self, booking: &Booking) -> Result<()>;

    /// Look up a booking by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Non-terminal bookings of the space whose interval overlaps the given
    /// one (half-open semantics).
    async fn find_active_overlapping(
        &self,
        space_id: Uuid,
        interval: &TimeInterval,
    ) -> Result<Vec<Booking>>;

    /// Non-terminal externally sourced bookings imported from one feed URL.
    async fn find_external_for_feed(
        &self,
        space_id: Uuid,
        feed_url: &str,
    ) -> Result<Vec<Booking>>;

    /// Bookings published on the space's outbound calendar feed.
    async fn find_visible_holds(&self, space_id: Uuid) -> Result<Vec<Booking>>;

    /// Pending bookings created before the cutoff (abandonment sweep).
    async fn find_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Confirmed bookings whose interval ended before the cutoff (overdue
    /// sweep).
    async fn find_confirmed_ending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Checked-in bookings whose interval ended before the cutoff
    /// (auto-completion sweep).
    async fn find_checked_in_ending_before(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<Booking>>;

    /// Apply a batch of inserts/updates atomically.
    ///
    /// Either every change lands or none does; a crash mid-run must not
    /// leave a space partially reconciled.
    async fn apply_changes(&self, changes: &[BookingChange]) -> Result<()>;
}

/// Trait for per-space calendar sync settings and the sync-run lock.
#[async_trait]
pub trait CalendarSettingsRepository: Send + Sync {
    /// Settings for one space, if sync was ever enabled for it.
    async fn get(&self, space_id: Uuid) -> Result<Option<SpaceCalendarSettings>>;

    /// Create or replace a space's settings row.
    async fn upsert(&self, settings: &SpaceCalendarSettings) -> Result<()>;

    /// Remove a space's settings (cascade from space deletion).
    async fn delete(&self, space_id: Uuid) -> Result<()>;

    /// All spaces the recurring sweep should sync.
    async fn list_sync_enabled(&self) -> Result<Vec<SpaceCalendarSettings>>;

    /// Try to acquire the per-space sync lock.
    ///
    /// Atomically moves `sync_status` to `InProgress` and stamps
    /// `last_sync_attempt = now`, unless another run already holds the lock
    /// and its attempt is younger than `stale_after`. A stale `InProgress`
    /// (crashed run) is taken over. Returns whether the lock was acquired.
    async fn try_begin_sync(
        &self,
        space_id: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<bool>;

    /// Release the lock, recording the run's outcome.
    ///
    /// `succeeded_at` updates `last_sync_time` when the run counts as a
    /// success; `error` replaces `last_sync_error` (pass `None` to clear).
    async fn finish_sync(
        &self,
        space_id: Uuid,
        status: SyncRunStatus,
        succeeded_at: Option<DateTime<Utc>>,
        error: Option<String>,
    ) -> Result<()>;
}
