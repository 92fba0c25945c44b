//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hivedesk_domain::Result;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Shared SQLite connection pool.
pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;
/// One checked-out pool connection.
pub type PooledSqlite = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager that owns the pool and bootstraps the schema.
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) the database at `db_path` with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let pool = r2d2::Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(InfraError::from)?;

        let db = Self { pool: Arc::new(pool), path };
        db.init_schema()?;

        info!(
            db_path = %db.path.display(),
            max_connections = db.pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(db)
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> Arc<SqlitePool> {
        Arc::clone(&self.pool)
    }

    /// Acquire a connection from the pool.
    pub fn get(&self) -> Result<PooledSqlite> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }

    /// Path this manager opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.get()?;
        conn.execute_batch(SCHEMA_SQL).map_err(InfraError::from)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(InfraError::from)?;
        Ok(())
    }
}
