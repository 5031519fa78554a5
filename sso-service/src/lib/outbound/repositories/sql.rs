use tracing::Span;

use crate::domain::session::errors::StoreError;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Classify a driver error into a `StoreError`.
///
/// `what` names the record involved and ends up in the error message.
pub(crate) fn classify(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::RowNotFound = err {
        return StoreError::NotFound(what.to_string());
    }

    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return StoreError::AlreadyExists(format!("{} ({})", what, constraint));
        }

        if let Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) = db_err.code().as_deref() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }

    StoreError::Database(err.to_string())
}

/// Span wrapping a single SQL statement.
pub(crate) fn query_span(operation: &'static str, statement: &'static str) -> Span {
    tracing::debug_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}
