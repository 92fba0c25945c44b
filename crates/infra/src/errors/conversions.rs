//! Conversions from external infrastructure errors into domain errors.

use hivedesk_domain::HiveDeskError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HiveDeskError);

impl From<InfraError> for HiveDeskError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HiveDeskError> for InfraError {
    fn from(value: HiveDeskError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → HiveDeskError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        HiveDeskError::Database("database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        HiveDeskError::Database("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => HiveDeskError::Database(format!(
                        "constraint violation (code {}): {message}",
                        err.extended_code
                    )),
                    _ => HiveDeskError::Database(format!(
                        "sqlite failure {:?} (code {}): {message}",
                        err.code, err.extended_code
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                HiveDeskError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                HiveDeskError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                HiveDeskError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                HiveDeskError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidQuery => HiveDeskError::Database("invalid SQL query".into()),
            other => HiveDeskError::Database(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → HiveDeskError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(HiveDeskError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → HiveDeskError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let mapped = if value.is_timeout() {
            HiveDeskError::Network(format!("request timed out: {value}"))
        } else if value.is_connect() {
            HiveDeskError::Network(format!("connection failed: {value}"))
        } else if value.is_builder() {
            HiveDeskError::InvalidInput(format!("invalid request: {value}"))
        } else {
            HiveDeskError::Network(value.to_string())
        };

        InfraError(mapped)
    }
}
