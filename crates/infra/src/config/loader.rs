//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `HIVEDESK_DB_PATH`: Database file path (required)
//! - `HIVEDESK_DB_POOL_SIZE`: Connection pool size (required)
//! - `HIVEDESK_SYNC_ENABLED`: Whether the recurring sweep runs (default true)
//! - `HIVEDESK_SYNC_CRON`: Cron expression for the sweep
//! - `HIVEDESK_FEED_TIMEOUT_SECS`: Per-fetch timeout for import URLs
//! - `HIVEDESK_FEED_MAX_BYTES`: Size cap for one feed document
//! - `HIVEDESK_STALE_LOCK_SECS`: Staleness window for sync-lock takeover
//! - `HIVEDESK_PENDING_TIMEOUT_MINUTES`: Confirmation window for bookings
//! - `HIVEDESK_NO_SHOW_GRACE_MINUTES`: Grace period before no-show marking

use std::path::{Path, PathBuf};

use hivedesk_domain::{
    BookingConfig, DatabaseConfig, EngineConfig, HiveDeskError, Result, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `HiveDeskError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<EngineConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `HIVEDESK_DB_PATH` and `HIVEDESK_DB_POOL_SIZE` are required; everything
/// else falls back to its default.
pub fn load_from_env() -> Result<EngineConfig> {
    let path = env_var("HIVEDESK_DB_PATH")?;
    let pool_size = env_var("HIVEDESK_DB_POOL_SIZE").and_then(|s| {
        s.parse::<u32>()
            .map_err(|e| HiveDeskError::Config(format!("invalid pool size: {e}")))
    })?;

    let sync_defaults = SyncConfig::default();
    let booking_defaults = BookingConfig::default();

    Ok(EngineConfig {
        database: DatabaseConfig { path, pool_size },
        sync: SyncConfig {
            enabled: env_bool("HIVEDESK_SYNC_ENABLED", sync_defaults.enabled),
            cron_expression: std::env::var("HIVEDESK_SYNC_CRON")
                .unwrap_or(sync_defaults.cron_expression),
            feed_timeout_secs: env_parsed(
                "HIVEDESK_FEED_TIMEOUT_SECS",
                sync_defaults.feed_timeout_secs,
            )?,
            max_feed_bytes: env_parsed("HIVEDESK_FEED_MAX_BYTES", sync_defaults.max_feed_bytes)?,
            stale_lock_secs: env_parsed(
                "HIVEDESK_STALE_LOCK_SECS",
                sync_defaults.stale_lock_secs,
            )?,
        },
        booking: BookingConfig {
            pending_timeout_minutes: env_parsed(
                "HIVEDESK_PENDING_TIMEOUT_MINUTES",
                booking_defaults.pending_timeout_minutes,
            )?,
            no_show_grace_minutes: env_parsed(
                "HIVEDESK_NO_SHOW_GRACE_MINUTES",
                booking_defaults.no_show_grace_minutes,
            )?,
        },
    })
}

/// Load configuration from a file
///
/// When `path` is `None`, probes the default locations (see
/// [`probe_config_paths`]). Format is chosen by extension: `.json` or
/// `.toml`.
pub fn load_from_file(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => probe_config_paths()
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| HiveDeskError::Config("no config file found".into()))?,
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        HiveDeskError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents).map_err(|e| {
            HiveDeskError::Config(format!("invalid JSON in {}: {e}", path.display()))
        })?,
        Some("toml") => toml::from_str(&contents).map_err(|e| {
            HiveDeskError::Config(format!("invalid TOML in {}: {e}", path.display()))
        })?,
        other => {
            return Err(HiveDeskError::Config(format!(
                "unsupported config format: {other:?}"
            )))
        }
    };

    tracing::info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

/// Candidate config file paths, in probe order.
pub fn probe_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for dir in ["./", "../"] {
        for name in ["hivedesk.json", "hivedesk.toml", "config.json", "config.toml"] {
            paths.push(PathBuf::from(dir).join(name));
        }
    }
    paths
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| HiveDeskError::Config(format!("missing environment variable: {name}")))
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| HiveDeskError::Config(format!("invalid value for {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
