//! Booking lifecycle service - core business logic

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hivedesk_domain::{
    Booking, BookingConfig, BookingSource, BookingStatus, BookingTransition, HiveDeskError,
    Result, TimeInterval,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::ports::{BookingChange, BookingRepository};
use crate::reconcile::{decide, Decision};

/// Result of a booking request, surfaced to the caller with a clear reason.
#[derive(Debug, Clone)]
pub enum BookingRequestOutcome {
    /// Stored as `Pending`, awaiting the payment collaborator's signal.
    Booked(Booking),
    /// Stored as `Conflict`; an external hold overlaps and needs manual
    /// resolution.
    Flagged(Booking),
    /// Not stored; the interval collides with an existing internal hold.
    Rejected { reason: String },
}

impl BookingRequestOutcome {
    /// Human-readable explanation for a non-booked outcome.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Booked(_) => None,
            Self::Flagged(_) => Some("ambiguous conflict - contact support"),
            Self::Rejected { reason } => Some(reason),
        }
    }
}

/// Booking lifecycle service
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    policy: BookingConfig,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(bookings: Arc<dyn BookingRepository>, policy: BookingConfig) -> Self {
        Self { bookings, policy }
    }

    /// Handle a user's booking request for a space and interval.
    ///
    /// Renter identity and space existence are vouched for by the upstream
    /// collaborators; this service only owns temporal consistency.
    #[instrument(skip(self))]
    pub async fn request_booking(
        &self,
        space_id: Uuid,
        renter_id: Uuid,
        interval: TimeInterval,
    ) -> Result<BookingRequestOutcome> {
        let overlapping = self.bookings.find_active_overlapping(space_id, &interval).await?;
        let now = Utc::now();

        match decide(BookingSource::Internal, None, &overlapping) {
            Decision::RejectOverlap => {
                info!(%space_id, %interval, "booking request rejected: overlap");
                Ok(BookingRequestOutcome::Rejected {
                    reason: "overlaps existing booking".into(),
                })
            }
            Decision::Accept => {
                let booking = Booking::new_internal(space_id, renter_id, interval, now);
                self.bookings.insert(&booking).await?;
                info!(booking_id = %booking.id, %space_id, "booking request accepted");
                Ok(BookingRequestOutcome::Booked(booking))
            }
            Decision::FlagConflict => {
                let mut booking = Booking::new_internal(space_id, renter_id, interval, now);
                booking.apply(BookingTransition::FlagConflict, now)?;

                let mut changes = vec![BookingChange::Insert(booking.clone())];
                for other in &overlapping {
                    if other.status.is_terminal() || other.status == BookingStatus::Conflict {
                        continue;
                    }
                    let mut flagged = other.clone();
                    flagged.apply(BookingTransition::FlagConflict, now)?;
                    changes.push(BookingChange::Update(flagged));
                }
                self.bookings.apply_changes(&changes).await?;

                warn!(
                    booking_id = %booking.id,
                    %space_id,
                    counterparts = changes.len() - 1,
                    "booking request flagged: ambiguous conflict with external hold"
                );
                Ok(BookingRequestOutcome::Flagged(booking))
            }
        }
    }

    /// Payment collaborator confirmed the hold.
    pub async fn confirm(&self, booking_id: Uuid) -> Result<Booking> {
        self.transition(booking_id, BookingTransition::Confirm).await
    }

    /// Explicit cancellation; legal from any non-terminal status.
    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking> {
        self.transition(booking_id, BookingTransition::Cancel).await
    }

    /// Renter checked in at the space.
    pub async fn check_in(&self, booking_id: Uuid) -> Result<Booking> {
        self.transition(booking_id, BookingTransition::CheckIn).await
    }

    /// Renter checked out; the booking completes.
    pub async fn check_out(&self, booking_id: Uuid) -> Result<Booking> {
        self.transition(booking_id, BookingTransition::CheckOut).await
    }

    /// Record a no-show, once the configured grace period past the interval
    /// start has elapsed.
    #[instrument(skip(self))]
    pub async fn mark_no_show(&self, booking_id: Uuid) -> Result<Booking> {
        let mut booking = self.load(booking_id).await?;
        let now = Utc::now();

        let grace_until =
            booking.interval.start() + Duration::minutes(self.policy.no_show_grace_minutes);
        if now <= grace_until {
            return Err(HiveDeskError::InvalidInput(format!(
                "no-show grace period runs until {}",
                grace_until.to_rfc3339()
            )));
        }

        if booking.apply(BookingTransition::MarkNoShow, now)? {
            self.bookings.update(&booking).await?;
        }
        Ok(booking)
    }

    /// Abandon `Pending` bookings whose confirmation window has closed.
    ///
    /// Returns the number of bookings swept.
    #[instrument(skip(self))]
    pub async fn expire_pending(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::minutes(self.policy.pending_timeout_minutes);
        let stale = self.bookings.find_pending_created_before(cutoff).await?;
        self.sweep(stale, BookingTransition::Abandon, now).await
    }

    /// Move `Confirmed` bookings past their interval end to `Overdue`.
    #[instrument(skip(self))]
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let lapsed = self.bookings.find_confirmed_ending_before(now).await?;
        self.sweep(lapsed, BookingTransition::MarkOverdue, now).await
    }

    /// Complete `CheckedIn` bookings whose interval has ended.
    #[instrument(skip(self))]
    pub async fn auto_complete(&self, now: DateTime<Utc>) -> Result<usize> {
        let ended = self.bookings.find_checked_in_ending_before(now).await?;
        self.sweep(ended, BookingTransition::CheckOut, now).await
    }

    async fn sweep(
        &self,
        bookings: Vec<Booking>,
        transition: BookingTransition,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut swept = 0;
        for mut booking in bookings {
            match booking.apply(transition, now) {
                Ok(true) => {
                    self.bookings.update(&booking).await?;
                    swept += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    // One odd row must not stall the sweep; the next pass
                    // retries it.
                    warn!(booking_id = %booking.id, error = %err, "sweep transition failed");
                }
            }
        }
        if swept > 0 {
            info!(swept, ?transition, "lifecycle sweep applied");
        }
        Ok(swept)
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        transition: BookingTransition,
    ) -> Result<Booking> {
        let mut booking = self.load(booking_id).await?;
        if booking.apply(transition, Utc::now())? {
            self.bookings.update(&booking).await?;
            info!(%booking_id, status = %booking.status, "booking transitioned");
        }
        Ok(booking)
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| HiveDeskError::NotFound(format!("booking {booking_id}")))
    }
}
