//! SQLite-backed implementation of the CalendarSettingsRepository port.
//!
//! The settings row doubles as the per-space sync lock: `try_begin_sync` is
//! a single guarded UPDATE, so two racing runs (even from different
//! processes) cannot both acquire it, and a crashed run's lock is taken
//! over once its attempt stamp goes stale.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hivedesk_core::CalendarSettingsRepository;
use hivedesk_domain::{HiveDeskError, Result, SpaceCalendarSettings, SyncRunStatus};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::SqlitePool;
use crate::errors::InfraError;

const SETTINGS_COLUMNS: &str = "space_id, import_urls, export_enabled, sync_enabled, \
                                last_sync_attempt, last_sync_time, sync_status, \
                                last_sync_error, created_at, updated_at";

/// SQLite implementation of `CalendarSettingsRepository`.
pub struct SqliteSettingsRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteSettingsRepository {
    /// Create a new settings repository on the shared pool.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }
}

#[async_trait]
impl CalendarSettingsRepository for SqliteSettingsRepository {
    async fn get(&self, space_id: Uuid) -> Result<Option<SpaceCalendarSettings>> {
        let conn = self.conn()?;
        let sql =
            format!("SELECT {SETTINGS_COLUMNS} FROM space_calendar_settings WHERE space_id = ?1");
        conn.query_row(&sql, params![space_id.to_string()], row_to_settings)
            .optional()
            .map_err(|e| InfraError::from(e).into())
    }

    #[instrument(skip(self, settings), fields(space_id = %settings.space_id))]
    async fn upsert(&self, settings: &SpaceCalendarSettings) -> Result<()> {
        let conn = self.conn()?;
        let import_urls = serde_json::to_string(&settings.import_urls)
            .map_err(|e| HiveDeskError::Internal(format!("failed to encode import urls: {e}")))?;

        conn.execute(
            "INSERT INTO space_calendar_settings (
                space_id, import_urls, export_enabled, sync_enabled,
                last_sync_attempt, last_sync_time, sync_status, last_sync_error,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(space_id) DO UPDATE SET
                import_urls = excluded.import_urls,
                export_enabled = excluded.export_enabled,
                sync_enabled = excluded.sync_enabled,
                last_sync_attempt = excluded.last_sync_attempt,
                last_sync_time = excluded.last_sync_time,
                sync_status = excluded.sync_status,
                last_sync_error = excluded.last_sync_error,
                updated_at = excluded.updated_at",
            params![
                settings.space_id.to_string(),
                import_urls,
                settings.export_enabled,
                settings.sync_enabled,
                settings.last_sync_attempt.map(|t| t.timestamp()),
                settings.last_sync_time.map(|t| t.timestamp()),
                settings.sync_status.as_str(),
                settings.last_sync_error,
                settings.created_at.timestamp(),
                settings.updated_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(space_id = %settings.space_id, "calendar settings upserted");
        Ok(())
    }

    async fn delete(&self, space_id: Uuid) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM space_calendar_settings WHERE space_id = ?1",
            params![space_id.to_string()],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    async fn list_sync_enabled(&self) -> Result<Vec<SpaceCalendarSettings>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {SETTINGS_COLUMNS} FROM space_calendar_settings
             WHERE sync_enabled = 1
             ORDER BY space_id ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
        let rows = stmt
            .query_map([], row_to_settings)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn try_begin_sync(
        &self,
        space_id: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let stale_cutoff = (now - stale_after).timestamp();

        // Single guarded UPDATE: acquires the lock unless a younger run
        // already holds it.
        let acquired = conn
            .execute(
                "UPDATE space_calendar_settings
                 SET sync_status = 'in_progress', last_sync_attempt = ?2, updated_at = ?2
                 WHERE space_id = ?1
                   AND (sync_status != 'in_progress'
                        OR last_sync_attempt IS NULL
                        OR last_sync_attempt <= ?3)",
                params![space_id.to_string(), now.timestamp(), stale_cutoff],
            )
            .map_err(InfraError::from)?;

        if acquired == 1 {
            return Ok(true);
        }

        // Distinguish lock contention from a missing row.
        let exists = conn
            .query_row(
                "SELECT 1 FROM space_calendar_settings WHERE space_id = ?1",
                params![space_id.to_string()],
                |_| Ok(()),
            )
            .optional()
            .map_err(InfraError::from)?
            .is_some();

        if exists {
            debug!(%space_id, "sync lock held by a younger run");
            Ok(false)
        } else {
            Err(HiveDeskError::NotFound(format!("calendar settings for space {space_id}")))
        }
    }

    #[instrument(skip(self))]
    async fn finish_sync(
        &self,
        space_id: Uuid,
        status: SyncRunStatus,
        succeeded_at: Option<DateTime<Utc>>,
        error: Option<String>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "UPDATE space_calendar_settings
                 SET sync_status = ?2,
                     last_sync_time = COALESCE(?3, last_sync_time),
                     last_sync_error = ?4,
                     updated_at = ?5
                 WHERE space_id = ?1",
                params![
                    space_id.to_string(),
                    status.as_str(),
                    succeeded_at.map(|t| t.timestamp()),
                    error,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(InfraError::from)?;

        if affected == 0 {
            return Err(HiveDeskError::NotFound(format!(
                "calendar settings for space {space_id}"
            )));
        }
        Ok(())
    }
}

fn row_to_settings(row: &Row<'_>) -> rusqlite::Result<SpaceCalendarSettings> {
    let space_id: String = row.get(0)?;
    let import_urls_json: String = row.get(1)?;
    let sync_status: String = row.get(6)?;

    let import_urls: Vec<String> = serde_json::from_str(&import_urls_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
    })?;

    Ok(SpaceCalendarSettings {
        space_id: space_id.parse().map_err(|e: uuid::Error| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
        })?,
        import_urls,
        export_enabled: row.get(2)?,
        sync_enabled: row.get(3)?,
        last_sync_attempt: opt_timestamp(4, row.get(4)?)?,
        last_sync_time: opt_timestamp(5, row.get(5)?)?,
        sync_status: sync_status.parse().map_err(|e: HiveDeskError| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
        })?,
        last_sync_error: row.get(7)?,
        created_at: req_timestamp(8, row.get(8)?)?,
        updated_at: req_timestamp(9, row.get(9)?)?,
    })
}

fn opt_timestamp(idx: usize, ts: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    ts.map(|t| req_timestamp(idx, t)).transpose()
}

fn req_timestamp(idx: usize, ts: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            "timestamp out of range".into(),
        )
    })
}
