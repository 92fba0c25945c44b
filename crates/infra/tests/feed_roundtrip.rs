//! Integration tests for the feed adapters: HTTP import, export, and the
//! export → import round trip through a real sync run.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hivedesk_core::{BookingRepository, CalendarSettingsRepository, FeedImporter, SyncService};
use hivedesk_domain::{
    Booking, BookingSource, BookingStatus, ExternalEvent, FeedError, SpaceCalendarSettings,
    SyncConfig, SyncRunStatus, TimeInterval,
};
use hivedesk_infra::{
    DbManager, HttpClient, HttpFeedImporter, IcalExporter, SqliteBookingRepository,
    SqliteSettingsRepository,
};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, hour, minute, 0).unwrap()
}

fn importer(max_feed_bytes: u64) -> HttpFeedImporter {
    let client = HttpClient::builder()
        .timeout(std::time::Duration::from_secs(5))
        .max_attempts(1)
        .build()
        .unwrap();
    HttpFeedImporter::with_client(client, max_feed_bytes)
}

fn sample_ics() -> String {
    "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n\
     BEGIN:VEVENT\r\nUID:evt-1\r\nDTSTAMP:20260601T000000Z\r\n\
     DTSTART:20260601T100000Z\r\nDTEND:20260601T110000Z\r\n\
     SUMMARY:Guest stay\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
        .to_string()
}

async fn serve(server: &MockServer, route: &str, body: String) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/calendar; charset=utf-8"),
        )
        .mount(server)
        .await;
    format!("{}{route}", server.uri())
}

#[tokio::test]
async fn http_import_fetches_and_parses_events() {
    let server = MockServer::start().await;
    let url = serve(&server, "/space.ics", sample_ics()).await;

    let events = importer(1024 * 1024).fetch(&url).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uid, "evt-1");
    assert_eq!(events[0].interval.start(), at(10, 0));
    assert_eq!(events[0].interval.end(), at(11, 0));
    assert_eq!(events[0].feed_url, url);
}

#[tokio::test]
async fn http_error_status_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.ics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = importer(1024)
        .fetch(&format!("{}/missing.ics", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Unreachable(msg) if msg.contains("404")));
}

#[tokio::test]
async fn oversized_feed_is_rejected() {
    let server = MockServer::start().await;
    let url = serve(&server, "/big.ics", sample_ics()).await;

    let err = importer(16).fetch(&url).await.unwrap_err();
    assert!(matches!(err, FeedError::TooLarge { limit_bytes: 16 }));
}

#[tokio::test]
async fn malformed_feed_is_a_parse_error() {
    let server = MockServer::start().await;
    let url = serve(&server, "/broken.ics", "BEGIN:VCALENDAR\r\nnonsense".into()).await;

    let err = importer(1024 * 1024).fetch(&url).await.unwrap_err();
    assert!(matches!(err, FeedError::Parse(_)));
}

#[tokio::test]
async fn unreachable_host_is_unreachable() {
    // Reserved TEST-NET address; nothing listens there.
    let err = importer(1024)
        .fetch("http://192.0.2.1:9/feed.ics")
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Unreachable(_)));
}

struct Engine {
    bookings: Arc<dyn BookingRepository>,
    settings: Arc<dyn CalendarSettingsRepository>,
    exporter: IcalExporter,
    _dir: TempDir,
}

fn engine() -> Engine {
    let dir = tempfile::tempdir().unwrap();
    let manager = DbManager::new(dir.path().join("engine.db"), 2).unwrap();
    let bookings: Arc<dyn BookingRepository> =
        Arc::new(SqliteBookingRepository::new(manager.pool()));
    let settings: Arc<dyn CalendarSettingsRepository> =
        Arc::new(SqliteSettingsRepository::new(manager.pool()));
    let exporter = IcalExporter::new(Arc::clone(&bookings));
    Engine { bookings, settings, exporter, _dir: dir }
}

#[tokio::test]
async fn export_then_reimport_round_trips_interval_and_uid() {
    let source = engine();
    let space_id = Uuid::now_v7();

    // Two holds on the source space.
    let windows = [(at(10, 0), at(11, 30)), (at(14, 0), at(15, 0))];
    let mut exported_ids = Vec::new();
    for (start, end) in windows {
        let event = ExternalEvent {
            uid: Uuid::now_v7().to_string(),
            interval: TimeInterval::new(start, end).unwrap(),
            summary: Some("hold".into()),
            feed_url: "https://upstream.example/feed.ics".into(),
        };
        let booking =
            Booking::from_external_event(space_id, BookingSource::OtherIcal, &event, at(0, 0));
        source.bookings.insert(&booking).await.unwrap();
        exported_ids.push(booking.id);
    }

    let document = String::from_utf8(source.exporter.export(space_id).await.unwrap()).unwrap();

    // Publish the export and sync it into an empty mirror space.
    let server = MockServer::start().await;
    let url = serve(&server, "/mirror.ics", document).await;

    let mirror = engine();
    let mirror_space = Uuid::now_v7();
    mirror
        .settings
        .upsert(&SpaceCalendarSettings::new(mirror_space, vec![url.clone()], at(0, 0)))
        .await
        .unwrap();

    let config = SyncConfig::default();
    let sync = SyncService::new(
        Arc::clone(&mirror.settings),
        Arc::clone(&mirror.bookings),
        Arc::new(importer(config.max_feed_bytes)),
        &config,
    );

    let report = sync.sync_space(mirror_space).await.unwrap();
    assert_eq!(report.status, SyncRunStatus::Completed);
    assert_eq!(report.inserted, 2);

    let mut mirrored = mirror.bookings.find_visible_holds(mirror_space).await.unwrap();
    mirrored.sort_by_key(|b| b.interval.start());

    for ((start, end), (copy, source_id)) in
        windows.iter().zip(mirrored.iter().zip(&exported_ids))
    {
        assert_eq!(copy.interval.start(), *start);
        assert_eq!(copy.interval.end(), *end);
        assert_eq!(copy.status, BookingStatus::External);
        // The mirrored UID is exactly the exported one.
        assert_eq!(
            copy.external_uid.as_deref(),
            Some(format!("{source_id}@hivedesk.app").as_str())
        );
    }
}

#[tokio::test]
async fn full_sync_run_against_http_feeds() {
    let server = MockServer::start().await;
    let good = serve(&server, "/good.ics", sample_ics()).await;
    Mock::given(method("GET"))
        .and(path("/down.ics"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let down = format!("{}/down.ics", server.uri());

    let e = engine();
    let space_id = Uuid::now_v7();
    e.settings
        .upsert(&SpaceCalendarSettings::new(
            space_id,
            vec![down.clone(), good],
            at(0, 0),
        ))
        .await
        .unwrap();

    let config = SyncConfig::default();
    let sync = SyncService::new(
        Arc::clone(&e.settings),
        Arc::clone(&e.bookings),
        Arc::new(importer(config.max_feed_bytes)),
        &config,
    );

    let report = sync.sync_space(space_id).await.unwrap();

    // One URL down, one healthy: the run still completes and records the
    // failure diagnostic.
    assert_eq!(report.status, SyncRunStatus::Completed);
    assert_eq!(report.urls_failed, 1);
    assert_eq!(report.inserted, 1);

    let stored = e.settings.get(space_id).await.unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncRunStatus::Completed);
    assert!(stored.last_sync_time.is_some());
    assert!(stored.last_sync_error.unwrap().contains("down.ics"));
}
