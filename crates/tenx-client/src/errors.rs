//! Client error types.

use thiserror::Error;

/// Errors talking to the chat log API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// No principal is configured.
    #[error("no user id configured")]
    Unauthenticated,
}

/// Errors reading or writing persisted chat state.
#[derive(Debug, Error)]
pub enum PersistError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State did not encode or decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;
