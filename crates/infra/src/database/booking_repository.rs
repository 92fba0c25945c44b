//! SQLite-backed implementation of the BookingRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivedesk_core::{BookingChange, BookingRepository};
use hivedesk_domain::{Booking, HiveDeskError, Result, TimeInterval};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::SqlitePool;
use crate::errors::InfraError;

const BOOKING_COLUMNS: &str = "id, space_id, renter_id, start_ts, end_ts, status, source, \
                               external_uid, feed_url, summary, created_at, updated_at";

/// SQLite implementation of `BookingRepository`.
pub struct SqliteBookingRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteBookingRepository {
    /// Create a new booking repository on the shared pool.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }

    fn query_bookings(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Booking>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params, row_to_booking)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(rows)
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let conn = self.conn()?;
        insert_row(&conn, booking)?;
        debug!(booking_id = %booking.id, status = %booking.status, "booking inserted");
        Ok(())
    }

    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn update(&self, booking: &Booking) -> Result<()> {
        let conn = self.conn()?;
        update_row(&conn, booking)?;
        debug!(booking_id = %booking.id, status = %booking.status, "booking updated");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
        let result = conn.query_row(&sql, params![id.to_string()], row_to_booking);
        match result {
            Ok(booking) => Ok(Some(booking)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(InfraError::from(e).into()),
        }
    }

    async fn find_active_overlapping(
        &self,
        space_id: Uuid,
        interval: &TimeInterval,
    ) -> Result<Vec<Booking>> {
        // Half-open overlap on the (space_id, start_ts, end_ts) index.
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE space_id = ?1 AND start_ts < ?2 AND end_ts > ?3
               AND status NOT IN ('completed','no_show','cancelled','abandoned')
             ORDER BY start_ts ASC"
        );
        self.query_bookings(
            &sql,
            &[
                &space_id.to_string() as &dyn rusqlite::ToSql,
                &interval.end().timestamp(),
                &interval.start().timestamp(),
            ],
        )
    }

    async fn find_external_for_feed(
        &self,
        space_id: Uuid,
        feed_url: &str,
    ) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE space_id = ?1 AND feed_url = ?2 AND external_uid IS NOT NULL
               AND status NOT IN ('completed','no_show','cancelled','abandoned')
             ORDER BY start_ts ASC"
        );
        self.query_bookings(&sql, &[&space_id.to_string() as &dyn rusqlite::ToSql, &feed_url])
    }

    async fn find_visible_holds(&self, space_id: Uuid) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE space_id = ?1
               AND status IN ('confirmed','checked_in','completed','external','conflict')
             ORDER BY start_ts ASC, id ASC"
        );
        self.query_bookings(&sql, &[&space_id.to_string() as &dyn rusqlite::ToSql])
    }

    async fn find_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'pending' AND created_at < ?1"
        );
        self.query_bookings(&sql, &[&cutoff.timestamp() as &dyn rusqlite::ToSql])
    }

    async fn find_confirmed_ending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'confirmed' AND end_ts < ?1"
        );
        self.query_bookings(&sql, &[&cutoff.timestamp() as &dyn rusqlite::ToSql])
    }

    async fn find_checked_in_ending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'checked_in' AND end_ts < ?1"
        );
        self.query_bookings(&sql, &[&cutoff.timestamp() as &dyn rusqlite::ToSql])
    }

    #[instrument(skip(self, changes), fields(count = changes.len()))]
    async fn apply_changes(&self, changes: &[BookingChange]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(InfraError::from)?;

        for change in changes {
            match change {
                BookingChange::Insert(booking) => insert_row(&tx, booking)?,
                BookingChange::Update(booking) => update_row(&tx, booking)?,
            }
        }

        tx.commit().map_err(InfraError::from)?;
        debug!(count = changes.len(), "booking changes committed");
        Ok(())
    }
}

fn insert_row(conn: &Connection, booking: &Booking) -> Result<()> {
    conn.execute(
        "INSERT INTO bookings (
            id, space_id, renter_id, start_ts, end_ts, status, source,
            external_uid, feed_url, summary, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id.to_string(),
            booking.space_id.to_string(),
            booking.renter_id.map(|id| id.to_string()),
            booking.interval.start().timestamp(),
            booking.interval.end().timestamp(),
            booking.status.as_str(),
            booking.source.as_str(),
            booking.external_uid,
            booking.feed_url,
            booking.summary,
            booking.created_at.timestamp(),
            booking.updated_at.timestamp(),
        ],
    )
    .map_err(InfraError::from)?;
    Ok(())
}

fn update_row(conn: &Connection, booking: &Booking) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE bookings SET
                space_id = ?2, renter_id = ?3, start_ts = ?4, end_ts = ?5,
                status = ?6, source = ?7, external_uid = ?8, feed_url = ?9,
                summary = ?10, created_at = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                booking.id.to_string(),
                booking.space_id.to_string(),
                booking.renter_id.map(|id| id.to_string()),
                booking.interval.start().timestamp(),
                booking.interval.end().timestamp(),
                booking.status.as_str(),
                booking.source.as_str(),
                booking.external_uid,
                booking.feed_url,
                booking.summary,
                booking.created_at.timestamp(),
                booking.updated_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

    if affected == 0 {
        return Err(HiveDeskError::NotFound(format!("booking {}", booking.id)));
    }
    Ok(())
}

fn row_to_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    let id: String = row.get(0)?;
    let space_id: String = row.get(1)?;
    let renter_id: Option<String> = row.get(2)?;
    let start_ts: i64 = row.get(3)?;
    let end_ts: i64 = row.get(4)?;
    let status: String = row.get(5)?;
    let source: String = row.get(6)?;

    let interval = DateTime::<Utc>::from_timestamp(start_ts, 0)
        .zip(DateTime::<Utc>::from_timestamp(end_ts, 0))
        .ok_or_else(|| conversion_err(3, Type::Integer, "timestamp out of range".into()))
        .and_then(|(start, end)| {
            TimeInterval::new(start, end)
                .map_err(|e| conversion_err(3, Type::Integer, e.to_string()))
        })?;

    Ok(Booking {
        id: parse_text(0, &id)?,
        space_id: parse_text(1, &space_id)?,
        renter_id: renter_id.as_deref().map(|s| parse_text(2, s)).transpose()?,
        interval,
        status: parse_text(5, &status)?,
        source: parse_text(6, &source)?,
        external_uid: row.get(7)?,
        feed_url: row.get(8)?,
        summary: row.get(9)?,
        created_at: timestamp_col(10, row.get(10)?)?,
        updated_at: timestamp_col(11, row.get(11)?)?,
    })
}

fn parse_text<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_col(idx: usize, ts: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .ok_or_else(|| conversion_err(idx, Type::Integer, "timestamp out of range".into()))
}

fn conversion_err(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}
