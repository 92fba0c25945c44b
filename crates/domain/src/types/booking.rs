//! Booking aggregate and lifecycle state machine
//!
//! A booking is never physically deleted: every lifecycle change is a status
//! transition, and the only way out of the active set is one of the terminal
//! statuses. Transitions not listed in the table below are rejected with
//! `InvalidTransition`; re-applying the transition that produced the current
//! status is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{HiveDeskError, Result};
use crate::types::interval::TimeInterval;
use crate::types::sync::ExternalEvent;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Overdue,
    NoShow,
    Cancelled,
    Abandoned,
    /// Authoritative copy lives in a third-party calendar feed.
    External,
    /// Contested hold; requires manual resolution (cancel one side).
    Conflict,
}

impl BookingStatus {
    /// Stable storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::NoShow => "no_show",
            Self::Cancelled => "cancelled",
            Self::Abandoned => "abandoned",
            Self::External => "external",
            Self::Conflict => "conflict",
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::NoShow | Self::Cancelled | Self::Abandoned)
    }

    /// Statuses published on the space's outbound calendar feed.
    pub fn is_visible_hold(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::CheckedIn | Self::Completed | Self::External | Self::Conflict
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = HiveDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "checked_in" => Ok(Self::CheckedIn),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            "no_show" => Ok(Self::NoShow),
            "cancelled" => Ok(Self::Cancelled),
            "abandoned" => Ok(Self::Abandoned),
            "external" => Ok(Self::External),
            "conflict" => Ok(Self::Conflict),
            other => {
                Err(HiveDeskError::InvalidInput(format!("unknown booking status: {other}")))
            }
        }
    }
}

/// Origin of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Internal,
    Airbnb,
    GoogleCalendar,
    OutlookCalendar,
    OtherIcal,
}

impl BookingSource {
    /// Stable storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Airbnb => "airbnb",
            Self::GoogleCalendar => "google_calendar",
            Self::OutlookCalendar => "outlook_calendar",
            Self::OtherIcal => "other_ical",
        }
    }

    /// Whether the authoritative record lives outside this system.
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Classify an import URL by its host.
    ///
    /// Unrecognized hosts fall back to `OtherIcal`; the feed still syncs,
    /// it just carries the generic source tag.
    pub fn from_feed_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains("airbnb.") {
            Self::Airbnb
        } else if lower.contains("google.") {
            Self::GoogleCalendar
        } else if lower.contains("outlook.") || lower.contains("office365.") {
            Self::OutlookCalendar
        } else {
            Self::OtherIcal
        }
    }
}

impl std::fmt::Display for BookingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingSource {
    type Err = HiveDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "internal" => Ok(Self::Internal),
            "airbnb" => Ok(Self::Airbnb),
            "google_calendar" => Ok(Self::GoogleCalendar),
            "outlook_calendar" => Ok(Self::OutlookCalendar),
            "other_ical" => Ok(Self::OtherIcal),
            other => {
                Err(HiveDeskError::InvalidInput(format!("unknown booking source: {other}")))
            }
        }
    }
}

/// Actions that move a booking through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTransition {
    /// Payment collaborator confirmed the hold.
    Confirm,
    /// Confirmation never arrived within the configured timeout.
    Abandon,
    /// Renter checked in at or after interval start.
    CheckIn,
    /// Explicit check-out, or automatic completion past interval end.
    CheckOut,
    /// Interval ended without a check-in.
    MarkOverdue,
    /// Renter never showed up (grace period enforced by the caller).
    MarkNoShow,
    /// Explicit cancellation, or the source VEVENT disappeared from its feed.
    Cancel,
    /// Conflict detector flagged an unresolvable overlap.
    FlagConflict,
}

impl BookingTransition {
    /// Status this transition lands in.
    pub fn target(&self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Abandon => BookingStatus::Abandoned,
            Self::CheckIn => BookingStatus::CheckedIn,
            Self::CheckOut => BookingStatus::Completed,
            Self::MarkOverdue => BookingStatus::Overdue,
            Self::MarkNoShow => BookingStatus::NoShow,
            Self::Cancel => BookingStatus::Cancelled,
            Self::FlagConflict => BookingStatus::Conflict,
        }
    }
}

/// Booking aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub space_id: Uuid,
    /// Absent for bookings sourced from an external feed.
    pub renter_id: Option<Uuid>,
    pub interval: TimeInterval,
    pub status: BookingStatus,
    pub source: BookingSource,
    /// UID of the originating VEVENT; keys idempotent re-sync.
    pub external_uid: Option<String>,
    /// Feed the external record came from; distinguishes two `OtherIcal`
    /// feeds on the same space.
    pub feed_url: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// New user-initiated booking awaiting confirmation.
    pub fn new_internal(
        space_id: Uuid,
        renter_id: Uuid,
        interval: TimeInterval,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            space_id,
            renter_id: Some(renter_id),
            interval,
            status: BookingStatus::Pending,
            source: BookingSource::Internal,
            external_uid: None,
            feed_url: None,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New booking materialized from an imported VEVENT.
    ///
    /// External bookings skip the payment/confirmation flow entirely and
    /// start in `External`.
    pub fn from_external_event(
        space_id: Uuid,
        source: BookingSource,
        event: &ExternalEvent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            space_id,
            renter_id: None,
            interval: event.interval,
            status: BookingStatus::External,
            source,
            external_uid: Some(event.uid.clone()),
            feed_url: Some(event.feed_url.clone()),
            summary: event.summary.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a lifecycle transition.
    ///
    /// Returns `Ok(true)` when the status changed, `Ok(false)` for an
    /// idempotent re-application (current status already equals the
    /// transition's target). Every other combination fails with
    /// `InvalidTransition` and leaves the booking untouched. Time-based
    /// guards (early check-in, premature overdue) fail with `InvalidInput`.
    pub fn apply(&mut self, transition: BookingTransition, now: DateTime<Utc>) -> Result<bool> {
        use BookingStatus as S;
        use BookingTransition as T;

        if self.status == transition.target() {
            return Ok(false);
        }

        let legal = match (self.status, transition) {
            (S::Pending, T::Confirm) => true,
            (S::Pending, T::Abandon) => true,
            (S::Confirmed, T::CheckIn) => {
                if now < self.interval.start() {
                    return Err(HiveDeskError::InvalidInput(format!(
                        "check-in before interval start {}",
                        self.interval.start().to_rfc3339()
                    )));
                }
                true
            }
            (S::CheckedIn, T::CheckOut) => true,
            (S::Confirmed, T::MarkOverdue) => {
                if now <= self.interval.end() {
                    return Err(HiveDeskError::InvalidInput(
                        "cannot mark overdue before the interval has ended".into(),
                    ));
                }
                true
            }
            (S::Confirmed | S::CheckedIn, T::MarkNoShow) => {
                if now <= self.interval.start() {
                    return Err(HiveDeskError::InvalidInput(
                        "cannot record a no-show before the interval starts".into(),
                    ));
                }
                true
            }
            (status, T::Cancel) => !status.is_terminal(),
            (status, T::FlagConflict) => !status.is_terminal(),
            _ => false,
        };

        if !legal {
            return Err(HiveDeskError::InvalidTransition {
                from: self.status,
                to: transition.target(),
            });
        }

        self.status = transition.target();
        self.updated_at = now;
        Ok(true)
    }

    /// Merge refreshed data from a re-imported VEVENT with the same UID.
    ///
    /// Returns true when anything observable changed.
    pub fn merge_external(&mut self, event: &ExternalEvent, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if self.interval != event.interval {
            self.interval = event.interval;
            changed = true;
        }
        if self.summary != event.summary {
            self.summary.clone_from(&event.summary);
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }
}
