//! Mock repository implementations for testing
//!
//! Provides in-memory mocks for the core storage ports, enabling
//! deterministic unit tests without database dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hivedesk_core::{BookingChange, BookingRepository, CalendarSettingsRepository};
use hivedesk_domain::{
    Booking, BookingStatus, HiveDeskError, Result, SpaceCalendarSettings, SyncRunStatus,
    TimeInterval,
};
use uuid::Uuid;

/// In-memory mock for `BookingRepository`.
#[derive(Default)]
pub struct MockBookingRepository {
    rows: Mutex<HashMap<Uuid, Booking>>,
}

impl MockBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a booking outside the repository API.
    pub fn seed(&self, booking: Booking) {
        self.rows.lock().unwrap().insert(booking.id, booking);
    }

    /// Snapshot of every stored booking, sorted by interval start.
    pub fn all(&self) -> Vec<Booking> {
        let mut rows: Vec<Booking> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|b| (b.interval.start(), b.id));
        rows
    }

    /// Current status of one booking.
    pub fn status_of(&self, id: Uuid) -> Option<BookingStatus> {
        self.rows.lock().unwrap().get(&id).map(|b| b.status)
    }
}

#[async_trait]
impl BookingRepository for MockBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.rows.lock().unwrap().insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&booking.id) {
            return Err(HiveDeskError::NotFound(format!("booking {}", booking.id)));
        }
        rows.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_active_overlapping(
        &self,
        space_id: Uuid,
        interval: &TimeInterval,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| {
                b.space_id == space_id
                    && !b.status.is_terminal()
                    && b.interval.overlaps(interval)
            })
            .cloned()
            .collect())
    }

    async fn find_external_for_feed(
        &self,
        space_id: Uuid,
        feed_url: &str,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| {
                b.space_id == space_id
                    && !b.status.is_terminal()
                    && b.external_uid.is_some()
                    && b.feed_url.as_deref() == Some(feed_url)
            })
            .cloned()
            .collect())
    }

    async fn find_visible_holds(&self, space_id: Uuid) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.space_id == space_id && b.status.is_visible_hold())
            .cloned()
            .collect())
    }

    async fn find_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn find_confirmed_ending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::Confirmed && b.interval.end() < cutoff)
            .cloned()
            .collect())
    }

    async fn find_checked_in_ending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::CheckedIn && b.interval.end() < cutoff)
            .cloned()
            .collect())
    }

    async fn apply_changes(&self, changes: &[BookingChange]) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        for change in changes {
            let booking = change.booking();
            rows.insert(booking.id, booking.clone());
        }
        Ok(())
    }
}

/// In-memory mock for `CalendarSettingsRepository`, including the CAS lock.
#[derive(Default)]
pub struct MockSettingsRepository {
    rows: Mutex<HashMap<Uuid, SpaceCalendarSettings>>,
}

impl MockSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, settings: SpaceCalendarSettings) {
        self.rows.lock().unwrap().insert(settings.space_id, settings);
    }

    pub fn get_sync(&self, space_id: Uuid) -> Option<SpaceCalendarSettings> {
        self.rows.lock().unwrap().get(&space_id).cloned()
    }
}

#[async_trait]
impl CalendarSettingsRepository for MockSettingsRepository {
    async fn get(&self, space_id: Uuid) -> Result<Option<SpaceCalendarSettings>> {
        Ok(self.rows.lock().unwrap().get(&space_id).cloned())
    }

    async fn upsert(&self, settings: &SpaceCalendarSettings) -> Result<()> {
        self.rows.lock().unwrap().insert(settings.space_id, settings.clone());
        Ok(())
    }

    async fn delete(&self, space_id: Uuid) -> Result<()> {
        self.rows.lock().unwrap().remove(&space_id);
        Ok(())
    }

    async fn list_sync_enabled(&self) -> Result<Vec<SpaceCalendarSettings>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.sync_enabled)
            .cloned()
            .collect())
    }

    async fn try_begin_sync(
        &self,
        space_id: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&space_id)
            .ok_or_else(|| HiveDeskError::NotFound(format!("settings for space {space_id}")))?;

        if row.sync_status == SyncRunStatus::InProgress {
            let stale = row
                .last_sync_attempt
                .map(|attempt| now - attempt >= stale_after)
                .unwrap_or(true);
            if !stale {
                return Ok(false);
            }
        }

        row.sync_status = SyncRunStatus::InProgress;
        row.last_sync_attempt = Some(now);
        row.updated_at = now;
        Ok(true)
    }

    async fn finish_sync(
        &self,
        space_id: Uuid,
        status: SyncRunStatus,
        succeeded_at: Option<DateTime<Utc>>,
        error: Option<String>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&space_id)
            .ok_or_else(|| HiveDeskError::NotFound(format!("settings for space {space_id}")))?;

        row.sync_status = status;
        if let Some(at) = succeeded_at {
            row.last_sync_time = Some(at);
        }
        row.last_sync_error = error;
        row.updated_at = Utc::now();
        Ok(())
    }
}
