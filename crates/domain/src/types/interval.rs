//! Half-open time intervals
//!
//! The booking engine treats every time range as half-open: the start instant
//! belongs to the range, the end instant does not. Two bookings that merely
//! touch at a boundary therefore never overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{HiveDeskError, Result};

/// Immutable half-open time range `[start, end)`.
///
/// Invariant: `start < end`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Build an interval, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(HiveDeskError::InvalidInput(format!(
                "interval start {start} must precede end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Inclusive start instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open overlap test: `a.start < b.end && b.start < a.end`.
    ///
    /// Symmetric; touching intervals (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the instant falls inside the range (start inclusive, end
    /// exclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
