//! Mapping database errors onto store errors.
//!
//! Anything that means "another unit got there first" becomes
//! [`StoreError::Contention`] so callers can retry; everything else is a
//! [`StoreError::Failure`].

use bankcore_core::store::StoreError;
use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};

/// SQLSTATE codes that indicate lock or serialization contention.
const CONTENTION_CODES: [&str; 4] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available (lock_timeout)
    "57014", // query_canceled (statement_timeout)
];

/// Returns true if a SQLSTATE code means the work may succeed on retry.
#[must_use]
pub fn is_contention_code(code: &str) -> bool {
    CONTENTION_CODES.contains(&code)
}

/// Extracts the SQLSTATE code from a database error, if the server sent one.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => driver_code(e),
        _ => None,
    }
}

fn driver_code(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(std::borrow::Cow::into_owned)
}

/// Converts a database error into a store error.
#[must_use]
pub fn map_db_err(err: DbErr) -> StoreError {
    let contended = matches!(err, DbErr::ConnectionAcquire(ConnAcquireErr::Timeout))
        || sqlstate(&err).is_some_and(|code| is_contention_code(&code));

    if contended {
        tracing::debug!(error = %err, "Database contention");
        StoreError::Contention(err.to_string())
    } else {
        tracing::error!(error = %err, "Database error");
        StoreError::Failure(err.to_string())
    }
}
