//! iCal feed export adapter
//!
//! Serializes a space's visible holds into a calendar document for external
//! subscribers. UIDs derive from booking ids and DTSTAMP from each row's
//! update stamp, so exporting unchanged data twice yields identical bytes.

use std::sync::Arc;

use hivedesk_core::BookingRepository;
use hivedesk_domain::constants::{EXPORT_CONTENT_TYPE, EXPORT_UID_SUFFIX};
use hivedesk_domain::{Booking, BookingStatus, Result};
use icalendar::{Calendar, Component, Event, EventLike, EventStatus};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Read-only export adapter over the booking store.
///
/// Safe to run concurrently with an in-progress sync; the feed reflects
/// whatever the store holds at read time (eventual consistency).
pub struct IcalExporter {
    bookings: Arc<dyn BookingRepository>,
}

impl IcalExporter {
    /// HTTP content type for the produced document.
    pub const CONTENT_TYPE: &'static str = EXPORT_CONTENT_TYPE;

    /// Create a new exporter.
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Render the space's current holds as ICS bytes.
    #[instrument(skip(self))]
    pub async fn export(&self, space_id: Uuid) -> Result<Vec<u8>> {
        let mut holds = self.bookings.find_visible_holds(space_id).await?;
        // Deterministic ordering keeps repeated exports byte-stable.
        holds.sort_by_key(|b| (b.interval.start(), b.id));

        let mut calendar = Calendar::new();
        calendar.name(&format!("HiveDesk space {space_id}"));

        for booking in &holds {
            calendar.push(to_vevent(booking));
        }

        debug!(%space_id, holds = holds.len(), "exported calendar feed");
        Ok(calendar.to_string().into_bytes())
    }
}

fn to_vevent(booking: &Booking) -> Event {
    let status = if booking.status == BookingStatus::Conflict {
        // Contested holds are published as tentative so subscribers see the
        // slot is in dispute rather than silently double-booked.
        EventStatus::Tentative
    } else {
        EventStatus::Confirmed
    };

    Event::new()
        .uid(&format!("{}{}", booking.id, EXPORT_UID_SUFFIX))
        .summary(booking.summary.as_deref().unwrap_or("Reserved"))
        .starts(booking.interval.start())
        .ends(booking.interval.end())
        .timestamp(booking.updated_at)
        .status(status)
        .done()
}
