//! Database implementations

pub mod booking_repository;
pub mod manager;
pub mod settings_repository;

pub use booking_repository::SqliteBookingRepository;
pub use manager::{DbManager, PooledSqlite, SqlitePool};
pub use settings_repository::SqliteSettingsRepository;
