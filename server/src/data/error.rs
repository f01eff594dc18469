//! Error type for row stores
//!
//! Store failures are split into two classes: transient ones (timeouts,
//! busy or closed pools, I/O) that a caller may retry, and fatal ones where
//! the store rejected the query itself.

use thiserror::Error;

/// SQLite primary result codes that indicate a temporary condition
const SQLITE_TRANSIENT_CODES: &[i32] = &[
    5,  // SQLITE_BUSY
    6,  // SQLITE_LOCKED
    10, // SQLITE_IOERR
    13, // SQLITE_FULL
];

#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Query exceeded the configured timeout
    #[error("Query timeout after {timeout_ms}ms on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_ms: u64,
    },

    /// The backend rejected the generated query
    #[error("Malformed query on {backend}: {reason}")]
    MalformedQuery {
        backend: &'static str,
        reason: String,
    },

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    /// Stored row could not be decoded
    #[error("Invalid row in {backend}: {reason}")]
    InvalidRow {
        backend: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn timeout(backend: &'static str, timeout_ms: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_ms,
        }
    }

    pub fn malformed(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedQuery {
            backend,
            reason: reason.into(),
        }
    }

    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    pub fn invalid_row(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            backend,
            reason: reason.into(),
        }
    }

    /// Check if the failure is temporary and the request may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::BackendUnavailable { .. } | Self::Io(_) => true,
            Self::MalformedQuery { .. } | Self::InvalidRow { .. } => false,
            Self::Sqlite(e) => match e {
                sqlx::Error::Database(db) => db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(|code| SQLITE_TRANSIENT_CODES.contains(&(code & 0xff))),
                sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::ColumnIndexOutOfBounds { .. }
                | sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::TypeNotFound { .. }
                | sqlx::Error::Decode(_)
                | sqlx::Error::RowNotFound => false,
                _ => true,
            },
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Timeout { backend, .. }
            | Self::MalformedQuery { backend, .. }
            | Self::BackendUnavailable { backend, .. }
            | Self::InvalidRow { backend, .. } => backend,
            Self::Io(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient() {
        let err = StoreError::timeout("sqlite", 10_000);
        assert!(err.is_transient());
        assert_eq!(err.backend(), "sqlite");
        assert_eq!(err.to_string(), "Query timeout after 10000ms on sqlite");
    }

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(StoreError::Sqlite(sqlx::Error::PoolTimedOut).is_transient());
        assert!(StoreError::Sqlite(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn test_decode_errors_are_fatal() {
        let err = StoreError::Sqlite(sqlx::Error::ColumnNotFound("price".into()));
        assert!(!err.is_transient());
        assert!(!StoreError::malformed("memory", "bad").is_transient());
        assert!(!StoreError::invalid_row("sqlite", "tags").is_transient());
    }

    #[tokio::test]
    async fn test_syntax_error_is_fatal() {
        let pool = sqlx::SqlitePool::connect(":memory:").await.unwrap();
        let err = sqlx::query("SELEC 1").execute(&pool).await.unwrap_err();
        assert!(!StoreError::from(err).is_transient());
    }

    #[tokio::test]
    async fn test_missing_table_is_fatal() {
        let pool = sqlx::SqlitePool::connect(":memory:").await.unwrap();
        let err = sqlx::query("SELECT * FROM missing")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(!StoreError::from(err).is_transient());
    }
}
