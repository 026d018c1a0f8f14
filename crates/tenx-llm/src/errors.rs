//! Model call errors.

/// Errors from a chat completion call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or extracted error message.
        message: String,
    },

    /// No client is registered for the provider.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The call was cancelled by its controller.
    #[error("request aborted")]
    Aborted {
        /// Text received before the abort.
        partial: String,
    },
}

impl LlmError {
    /// Whether the error is a user abort rather than a failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Api { .. } => "api",
            Self::UnknownProvider(_) => "config",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// Result type alias for model calls.
pub type Result<T> = std::result::Result<T, LlmError>;
