//! Calendar sync scheduler
//!
//! Cron-driven trigger for the recurring sync sweep across all sync-enabled
//! spaces. Per-space mutual exclusion lives in the settings-row lock, not
//! here; an overlapping tick simply observes skipped spaces in the sweep
//! report. The scheduler itself only guarantees lifecycle hygiene: tracked
//! join handles, explicit cancellation, timeouts on every await.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hivedesk_core::SyncService;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single sweep execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */15 * * * *".into(), // every 15 minutes
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Sync sweep scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    sync_service: Arc<SyncService>,
}

impl SyncScheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(cron_expression: String, sync_service: Arc<SyncService>) -> Self {
        let config = SyncSchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, sync_service)
    }

    /// Create a scheduler with a custom configuration.
    pub fn with_config(config: SyncSchedulerConfig, sync_service: Arc<SyncService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            sync_service,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });
        self.monitor_handle = Some(handle);

        info!(cron = %self.config.cron_expression, "sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let cron_expr = self.config.cron_expression.clone();
        let sync_service = Arc::clone(&self.sync_service);
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let sync_service = Arc::clone(&sync_service);

            Box::pin(async move {
                let started = Instant::now();

                match tokio::time::timeout(job_timeout, sync_service.sync_all()).await {
                    Ok(Ok(sweep)) => {
                        debug!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            completed = sweep.completed,
                            conflicts = sweep.conflicts,
                            failed = sweep.failed,
                            skipped = sweep.skipped,
                            "scheduled sync sweep finished"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(error = %err, "scheduled sync sweep failed");
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = job_timeout.as_secs(),
                            "scheduled sync sweep timed out"
                        );
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered sync sweep job");
        Ok(scheduler)
    }

    async fn monitor_task(cancel: CancellationToken) {
        cancel.cancelled().await;
        debug!("sync scheduler monitor cancelled");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
