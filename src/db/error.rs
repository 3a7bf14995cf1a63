//! Database error types.

use thiserror::Error;

/// Errors raised while opening a connection or running a statement.
#[derive(Debug, Error)]
pub enum DbError {
    /// Driver-level failure (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Native HANA driver failure.
    #[error("hana error: {0}")]
    Hana(#[from] hdbconnect_async::HdbError),

    /// The connection did not open in time.
    #[error("connect timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Statement failed for a reason reported by another backend.
    #[error("query failed: {0}")]
    Query(String),

    /// Connection string could not be built for the target.
    #[error("invalid dsn: {0}")]
    InvalidDsn(String),

    /// The connection was already closed.
    #[error("connection closed")]
    Closed,
}
