//! Conflict detection for booking candidates
//!
//! Classifies a candidate booking against the overlapping bookings already
//! held for the space. Internal requests lose to existing internal holds
//! (first writer wins); anything that crosses a source boundary is flagged
//! rather than silently discarded, because both sides may be legitimate
//! holds on different platforms.

use hivedesk_domain::{Booking, BookingSource};
use serde::{Deserialize, Serialize};

/// Outcome of reconciling one candidate against a space's booking set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// No live overlap; the candidate may be stored as-is.
    Accept,
    /// Internal candidate overlaps an internal hold; surfaced to the caller
    /// as a business rejection.
    RejectOverlap,
    /// Cross-source overlap; both sides get the `Conflict` status and wait
    /// for manual resolution.
    FlagConflict,
}

/// Classify a candidate against the overlap set.
///
/// `overlapping` is the set of bookings for the same space whose intervals
/// overlap the candidate's; terminal rows are ignored here so callers may
/// pass raw query results. For externally sourced candidates,
/// `candidate_feed_url` identifies the candidate's own feed: events from the
/// same feed never conflict with each other (platforms publish back-to-back
/// and overlapping holds of their own), and same-UID merging happens before
/// this function is reached.
pub fn decide(
    candidate_source: BookingSource,
    candidate_feed_url: Option<&str>,
    overlapping: &[Booking],
) -> Decision {
    let live: Vec<&Booking> = overlapping.iter().filter(|b| !b.status.is_terminal()).collect();

    if live.is_empty() {
        return Decision::Accept;
    }

    if !candidate_source.is_external() {
        // First writer wins between internal holds; an external-only overlap
        // may be a stale platform hold, so it is flagged instead.
        if live.iter().any(|b| !b.source.is_external()) {
            return Decision::RejectOverlap;
        }
        return Decision::FlagConflict;
    }

    let crosses_feed = live.iter().any(|b| {
        !(b.source.is_external() && b.feed_url.as_deref() == candidate_feed_url)
    });
    if crosses_feed {
        Decision::FlagConflict
    } else {
        Decision::Accept
    }
}
