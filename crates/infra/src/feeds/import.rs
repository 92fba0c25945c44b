//! iCal feed import adapter
//!
//! Fetches one calendar document over HTTP and parses its VEVENTs into
//! `ExternalEvent`s. Parsing is all-or-nothing per URL: a malformed document
//! discards every event it contained, so a partially corrupt feed can never
//! apply a partial event set.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivedesk_core::FeedImporter;
use hivedesk_domain::{ExternalEvent, FeedError, HiveDeskError, SyncConfig, TimeInterval};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime};
use tracing::{debug, instrument};

use crate::http::HttpClient;

/// HTTP-backed implementation of the `FeedImporter` port.
pub struct HttpFeedImporter {
    client: HttpClient,
    max_feed_bytes: u64,
}

impl HttpFeedImporter {
    /// Build an importer from the sync configuration.
    pub fn new(config: &SyncConfig) -> Result<Self, HiveDeskError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .user_agent("hivedesk-sync/0.1")
            .build()?;
        Ok(Self { client, max_feed_bytes: config.max_feed_bytes })
    }

    /// Build an importer around an existing client (tests, custom wiring).
    pub fn with_client(client: HttpClient, max_feed_bytes: u64) -> Self {
        Self { client, max_feed_bytes }
    }
}

#[async_trait]
impl FeedImporter for HttpFeedImporter {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<ExternalEvent>, FeedError> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unreachable(format!("{url} returned HTTP {status}")));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_feed_bytes {
                return Err(FeedError::TooLarge { limit_bytes: self.max_feed_bytes });
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Unreachable(format!("failed to read body: {e}")))?;

        if body.len() as u64 > self.max_feed_bytes {
            return Err(FeedError::TooLarge { limit_bytes: self.max_feed_bytes });
        }

        let events = parse_feed(&body, url)?;
        debug!(url, events = events.len(), "feed parsed");
        Ok(events)
    }
}

/// Parse a calendar document into events.
///
/// Non-event components (VTODO, VTIMEZONE, ...) are skipped; VEVENTs missing
/// UID, DTSTART or DTEND make the whole document a parse error.
pub fn parse_feed(raw: &str, feed_url: &str) -> Result<Vec<ExternalEvent>, FeedError> {
    let calendar: Calendar = raw.parse().map_err(|e| FeedError::Parse(format!("{e}")))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else { continue };

        let uid = event
            .get_uid()
            .ok_or_else(|| FeedError::Parse("VEVENT missing UID".into()))?
            .to_string();

        let start = event
            .get_start()
            .and_then(to_utc)
            .ok_or_else(|| FeedError::Parse(format!("event {uid}: missing or invalid DTSTART")))?;
        let end = event
            .get_end()
            .and_then(to_utc)
            .ok_or_else(|| FeedError::Parse(format!("event {uid}: missing or invalid DTEND")))?;

        let interval = TimeInterval::new(start, end)
            .map_err(|e| FeedError::Parse(format!("event {uid}: {e}")))?;

        events.push(ExternalEvent {
            uid,
            interval,
            summary: event.get_summary().map(str::to_string),
            feed_url: feed_url.to_string(),
        });
    }

    Ok(events)
}

/// Normalize the calendar crate's date representations to UTC instants.
///
/// Floating and zoned local times are read as UTC; all-day dates become
/// midnight UTC. Feeds that care about exact zones publish Zulu stamps, which
/// pass through untouched.
fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::DateTime(dt) => match dt {
            CalendarDateTime::Utc(utc) => Some(utc),
            CalendarDateTime::Floating(naive) => Some(naive.and_utc()),
            CalendarDateTime::WithTimezone { date_time, .. } => Some(date_time.and_utc()),
        },
        DatePerhapsTime::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_URL: &str = "https://example.org/space.ics";

    fn feed(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn parses_well_formed_events() {
        let raw = feed(
            "BEGIN:VEVENT\r\nUID:evt-1\r\nDTSTAMP:20260601T000000Z\r\nDTSTART:20260601T100000Z\r\nDTEND:20260601T110000Z\r\nSUMMARY:Team offsite\r\nEND:VEVENT\r\n",
        );

        let events = parse_feed(&raw, FEED_URL).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "evt-1");
        assert_eq!(events[0].summary.as_deref(), Some("Team offsite"));
        assert_eq!(events[0].feed_url, FEED_URL);
        assert_eq!(
            events[0].interval.duration(),
            chrono::Duration::hours(1)
        );
    }

    #[test]
    fn missing_dtend_fails_the_whole_document() {
        let raw = feed(
            "BEGIN:VEVENT\r\nUID:good\r\nDTSTAMP:20260601T000000Z\r\nDTSTART:20260601T100000Z\r\nDTEND:20260601T110000Z\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:bad\r\nDTSTAMP:20260601T000000Z\r\nDTSTART:20260601T120000Z\r\nEND:VEVENT\r\n",
        );

        // All-or-nothing: the valid first event is discarded too.
        let err = parse_feed(&raw, FEED_URL).unwrap_err();
        assert!(matches!(err, FeedError::Parse(msg) if msg.contains("bad")));
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let err = parse_feed("this is not a calendar", FEED_URL).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn inverted_interval_is_a_parse_error() {
        let raw = feed(
            "BEGIN:VEVENT\r\nUID:backwards\r\nDTSTAMP:20260601T000000Z\r\nDTSTART:20260601T110000Z\r\nDTEND:20260601T100000Z\r\nEND:VEVENT\r\n",
        );
        let err = parse_feed(&raw, FEED_URL).unwrap_err();
        assert!(matches!(err, FeedError::Parse(msg) if msg.contains("backwards")));
    }

    #[test]
    fn non_event_components_are_skipped() {
        let raw = feed(
            "BEGIN:VTODO\r\nUID:todo-1\r\nDTSTAMP:20260601T000000Z\r\nSUMMARY:ignore me\r\nEND:VTODO\r\n",
        );
        let events = parse_feed(&raw, FEED_URL).unwrap();
        assert!(events.is_empty());
    }
}
