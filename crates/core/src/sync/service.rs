//! Sync orchestrator
//!
//! Runs one space's import → reconcile → bookkeeping sequence. Runs for the
//! same space are mutually exclusive through the persisted settings-row lock
//! (with stale-lock takeover), runs for different spaces proceed
//! concurrently. All booking writes of one run commit in a single
//! transaction via [`BookingRepository::apply_changes`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future;
use hivedesk_domain::{
    truncate_diagnostic, Booking, BookingSource, BookingStatus, BookingTransition, ExternalEvent,
    FeedError, HiveDeskError, Result, SpaceCalendarSettings, SyncConfig, SyncReport,
    SyncRunStatus, TimeInterval,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::booking::ports::{BookingChange, BookingRepository, CalendarSettingsRepository};
use crate::reconcile::{decide, Decision};
use crate::sync::ports::FeedImporter;

/// Aggregate outcome of one sweep across all sync-enabled spaces.
#[derive(Debug, Clone, Default)]
pub struct SyncSweepReport {
    pub spaces: usize,
    pub completed: usize,
    pub conflicts: usize,
    pub failed: usize,
    /// Spaces skipped because another run held their lock.
    pub skipped: usize,
}

/// Sync orchestrator service
pub struct SyncService {
    settings: Arc<dyn CalendarSettingsRepository>,
    bookings: Arc<dyn BookingRepository>,
    importer: Arc<dyn FeedImporter>,
    stale_lock: Duration,
}

impl SyncService {
    /// Create a new sync service
    pub fn new(
        settings: Arc<dyn CalendarSettingsRepository>,
        bookings: Arc<dyn BookingRepository>,
        importer: Arc<dyn FeedImporter>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            settings,
            bookings,
            importer,
            stale_lock: Duration::seconds(config.stale_lock_secs),
        }
    }

    /// Run one sync pass for a single space.
    ///
    /// Scheduled and on-demand triggers share this path; the outcome does
    /// not depend on who asked. Fails with `SyncInProgress` when another
    /// run holds the space's lock and is not stale.
    #[instrument(skip(self))]
    pub async fn sync_space(&self, space_id: Uuid) -> Result<SyncReport> {
        let settings = self
            .settings
            .get(space_id)
            .await?
            .ok_or_else(|| HiveDeskError::NotFound(format!("calendar settings for space {space_id}")))?;

        let now = Utc::now();
        if !self.settings.try_begin_sync(space_id, now, self.stale_lock).await? {
            debug!(%space_id, "sync lock held; skipping run");
            return Err(HiveDeskError::SyncInProgress(space_id));
        }

        info!(%space_id, urls = settings.import_urls.len(), "sync run started");

        match self.run_locked(&settings, now).await {
            Ok(report) => {
                let succeeded_at = matches!(
                    report.status,
                    SyncRunStatus::Completed | SyncRunStatus::ConflictDetected
                )
                .then_some(now);
                self.settings
                    .finish_sync(space_id, report.status, succeeded_at, report.last_error.clone())
                    .await?;
                info!(
                    %space_id,
                    status = %report.status,
                    inserted = report.inserted,
                    merged = report.merged,
                    flagged = report.flagged,
                    cancelled = report.cancelled_missing,
                    "sync run finished"
                );
                Ok(report)
            }
            Err(err) => {
                let diagnostic = truncate_diagnostic(&err.to_string());
                self.settings
                    .finish_sync(space_id, SyncRunStatus::Failed, None, Some(diagnostic))
                    .await?;
                warn!(%space_id, error = %err, "sync run failed");
                Err(err)
            }
        }
    }

    /// Sweep every sync-enabled space.
    ///
    /// Spaces run concurrently; a space whose lock is held is counted as
    /// skipped, not failed.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncSweepReport> {
        let spaces = self.settings.list_sync_enabled().await?;
        let mut report = SyncSweepReport { spaces: spaces.len(), ..Default::default() };

        let runs = spaces.iter().map(|s| self.sync_space(s.space_id));
        for outcome in future::join_all(runs).await {
            match outcome {
                Ok(run) => match run.status {
                    SyncRunStatus::ConflictDetected => report.conflicts += 1,
                    SyncRunStatus::Failed => report.failed += 1,
                    _ => report.completed += 1,
                },
                Err(HiveDeskError::SyncInProgress(_)) => report.skipped += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            spaces = report.spaces,
            completed = report.completed,
            conflicts = report.conflicts,
            failed = report.failed,
            skipped = report.skipped,
            "sync sweep finished"
        );
        Ok(report)
    }

    /// The body of a run, executed while holding the space's lock.
    async fn run_locked(
        &self,
        settings: &SpaceCalendarSettings,
        now: DateTime<Utc>,
    ) -> Result<SyncReport> {
        let space_id = settings.space_id;
        let mut report = SyncReport::new(space_id, settings.import_urls.len());

        // Fetch every URL concurrently; the fetches are independent.
        let fetches = settings.import_urls.iter().map(|url| {
            let importer = Arc::clone(&self.importer);
            let url = url.clone();
            async move {
                let outcome = importer.fetch(&url).await;
                (url, outcome)
            }
        });

        let mut feeds: Vec<(String, Vec<ExternalEvent>)> = Vec::new();
        let mut failures: Vec<(String, FeedError)> = Vec::new();
        for (url, outcome) in future::join_all(fetches).await {
            match outcome {
                Ok(events) => {
                    debug!(%space_id, url = %url, events = events.len(), "feed imported");
                    feeds.push((url, events));
                }
                Err(err) => {
                    warn!(%space_id, url = %url, error = %err, "feed import failed");
                    failures.push((url, err));
                }
            }
        }

        report.urls_failed = failures.len();
        if let Some((url, err)) = failures.last() {
            report.last_error = Some(truncate_diagnostic(&format!("{url}: {err}")));
        }

        // Every URL failed: record the failure and leave bookings untouched.
        if feeds.is_empty() && !settings.import_urls.is_empty() {
            report.status = SyncRunStatus::Failed;
            return Ok(report);
        }

        // Reconcile sequentially; a candidate may depend on writes staged by
        // an earlier candidate of the same run (same-feed UID merges).
        let mut run = RunState::default();
        for (url, events) in &feeds {
            self.reconcile_feed(settings.space_id, url, events, &mut run, &mut report, now)
                .await?;
        }

        let changes = run.into_changes();
        if !changes.is_empty() {
            self.bookings.apply_changes(&changes).await?;
        }

        report.status = if report.flagged > 0 {
            SyncRunStatus::ConflictDetected
        } else {
            SyncRunStatus::Completed
        };
        Ok(report)
    }

    /// Fold one successful feed's events into the run state.
    async fn reconcile_feed(
        &self,
        space_id: Uuid,
        feed_url: &str,
        events: &[ExternalEvent],
        run: &mut RunState,
        report: &mut SyncReport,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let source = BookingSource::from_feed_url(feed_url);
        let existing = self.bookings.find_external_for_feed(space_id, feed_url).await?;

        let mut known_uids: HashMap<String, Uuid> = HashMap::new();
        for booking in &existing {
            if let Some(uid) = &booking.external_uid {
                known_uids.insert(uid.clone(), booking.id);
            }
            run.remember(booking.clone());
        }

        let mut seen_uids: HashSet<String> = HashSet::new();
        for event in events {
            report.events_seen += 1;
            if !seen_uids.insert(event.uid.clone()) {
                // A feed repeating a UID within one document is merged into
                // the first occurrence rather than duplicated.
                debug!(url = %feed_url, uid = %event.uid, "duplicate uid within feed document");
                continue;
            }

            if let Some(&id) = known_uids.get(&event.uid) {
                // Same feed, same UID: the same booking, refreshed in place.
                if let Some(mut booking) = run.current(id) {
                    if booking.merge_external(event, now) {
                        run.stage_update(booking);
                        report.merged += 1;
                    }
                }
                continue;
            }

            let candidate_overlaps =
                self.effective_overlaps(space_id, &event.interval, run).await?;
            let mut candidate = Booking::from_external_event(space_id, source, event, now);

            match decide(source, Some(feed_url), &candidate_overlaps) {
                Decision::Accept => {
                    run.stage_insert(candidate);
                    report.inserted += 1;
                }
                Decision::FlagConflict => {
                    candidate.apply(BookingTransition::FlagConflict, now)?;
                    run.stage_insert(candidate);
                    report.inserted += 1;
                    report.flagged += 1;

                    for other in candidate_overlaps {
                        if other.status.is_terminal() || other.status == BookingStatus::Conflict {
                            continue;
                        }
                        let mut flagged = other;
                        flagged.apply(BookingTransition::FlagConflict, now)?;
                        run.stage_update(flagged);
                        report.flagged += 1;
                    }
                }
                // An external candidate is never auto-rejected; the decision
                // table only rejects internal-vs-internal overlaps.
                Decision::RejectOverlap => {
                    return Err(HiveDeskError::Internal(
                        "conflict detector rejected an external candidate".into(),
                    ));
                }
            }
        }

        // VEVENTs that disappeared from their feed release the hold.
        for booking in existing {
            let Some(uid) = booking.external_uid.clone() else { continue };
            if seen_uids.contains(&uid) {
                continue;
            }
            let Some(mut current) = run.current(booking.id) else { continue };
            if current.status.is_terminal() {
                continue;
            }
            current.apply(BookingTransition::Cancel, now)?;
            run.stage_update(current);
            report.cancelled_missing += 1;
            debug!(url = %feed_url, uid = %uid, "external event disappeared; booking cancelled");
        }

        Ok(())
    }

    /// Overlap set for a candidate: repository rows overlaid with this run's
    /// staged versions, plus bookings staged for insert earlier in the run.
    async fn effective_overlaps(
        &self,
        space_id: Uuid,
        interval: &TimeInterval,
        run: &RunState,
    ) -> Result<Vec<Booking>> {
        let mut overlaps: Vec<Booking> = Vec::new();
        for booking in self.bookings.find_active_overlapping(space_id, interval).await? {
            if !run.is_staged(booking.id) {
                overlaps.push(booking);
            }
        }
        overlaps.extend(run.staged_overlapping(interval));
        Ok(overlaps)
    }
}

/// Working set of one sync run.
///
/// Tracks the latest in-run version of every touched booking so later
/// candidates reconcile against earlier staged writes, and remembers which
/// rows are new so the final change list distinguishes inserts from updates.
#[derive(Default)]
struct RunState {
    /// Latest version of every booking this run has loaded or written,
    /// keyed by id. Only ids in `dirty` are flushed.
    versions: HashMap<Uuid, Booking>,
    /// Ids written this run, in first-write order (insert-before-update
    /// ordering is preserved for the transaction).
    dirty: Vec<Uuid>,
    inserted: HashSet<Uuid>,
}

impl RunState {
    /// Track a repository row without marking it dirty.
    fn remember(&mut self, booking: Booking) {
        self.versions.entry(booking.id).or_insert(booking);
    }

    /// Latest in-run version of a tracked booking.
    fn current(&self, id: Uuid) -> Option<Booking> {
        self.versions.get(&id).cloned()
    }

    fn is_staged(&self, id: Uuid) -> bool {
        self.versions.contains_key(&id)
    }

    fn stage_insert(&mut self, booking: Booking) {
        let id = booking.id;
        self.inserted.insert(id);
        self.mark_dirty(id);
        self.versions.insert(id, booking);
    }

    fn stage_update(&mut self, booking: Booking) {
        let id = booking.id;
        self.mark_dirty(id);
        self.versions.insert(id, booking);
    }

    fn mark_dirty(&mut self, id: Uuid) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
    }

    /// Staged or tracked non-terminal bookings overlapping the interval.
    fn staged_overlapping(&self, interval: &TimeInterval) -> Vec<Booking> {
        self.versions
            .values()
            .filter(|b| !b.status.is_terminal() && b.interval.overlaps(interval))
            .cloned()
            .collect()
    }

    fn into_changes(self) -> Vec<BookingChange> {
        let RunState { mut versions, dirty, inserted } = self;
        dirty
            .into_iter()
            .filter_map(|id| {
                let booking = versions.remove(&id)?;
                Some(if inserted.contains(&id) {
                    BookingChange::Insert(booking)
                } else {
                    BookingChange::Update(booking)
                })
            })
            .collect()
    }
}
