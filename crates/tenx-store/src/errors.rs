//! Error types for the store.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON column could not be encoded or decoded.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// A record with the same unique key already exists.
    #[error("{kind} already exists: {key}")]
    Duplicate {
        /// Record kind (`chat log`, `configuration`).
        kind: &'static str,
        /// Conflicting key.
        key: String,
    },
}

impl StoreError {
    /// Map a unique-constraint violation onto [`StoreError::Duplicate`].
    pub(crate) fn from_insert(err: rusqlite::Error, kind: &'static str, key: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::Duplicate {
                    kind,
                    key: key.to_owned(),
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
