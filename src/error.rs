//! Error types for the data store.
//!
//! Engine errors are never retried or swallowed. They are classified once,
//! on the way out, into the three failure kinds callers care about.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors returned by [`crate::DataStore`] operations.
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// The database file or engine could not be opened or closed.
    #[error("connection error ({}): {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Malformed SQL, unknown table/column, or any other engine failure.
    #[error("query error: {0}")]
    Query(#[source] rusqlite::Error),

    /// A write violated a schema constraint.
    #[error("constraint violation: {0}")]
    Constraint(#[source] rusqlite::Error),

    /// Identifier rejected by [`crate::IdentifierPolicy::Strict`].
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

impl DataStoreError {
    pub(crate) fn connection(path: impl Into<PathBuf>, source: rusqlite::Error) -> Self {
        Self::Connection {
            path: path.into(),
            source,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}

impl From<rusqlite::Error> for DataStoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Constraint(err),
            _ => Self::Query(err),
        }
    }
}

/// Convenience type alias for data store results.
pub type Result<T> = std::result::Result<T, DataStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: i32, msg: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), Some(msg.to_string()))
    }

    #[test]
    fn constraint_failure_is_classified() {
        let err: DataStoreError =
            failure(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE, "UNIQUE constraint failed").into();
        assert!(err.is_constraint());
        assert!(err.to_string().starts_with("constraint violation"));
    }

    #[test]
    fn other_failures_are_query_errors() {
        let err: DataStoreError = failure(rusqlite::ffi::SQLITE_ERROR, "no such table: x").into();
        assert!(matches!(err, DataStoreError::Query(_)));

        let err: DataStoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DataStoreError::Query(_)));
    }

    #[test]
    fn connection_display_includes_path() {
        let err = DataStoreError::connection(
            "/nope/db.sqlite",
            failure(rusqlite::ffi::SQLITE_CANTOPEN, "unable to open database file"),
        );
        assert!(err.to_string().contains("/nope/db.sqlite"));
    }

    #[test]
    fn invalid_identifier_display() {
        let err = DataStoreError::InvalidIdentifier("users; DROP".into());
        assert_eq!(err.to_string(), r#"invalid identifier: "users; DROP""#);
    }
}
