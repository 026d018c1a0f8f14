//! Auth error types.

/// Errors that can occur while issuing or delivering a one-time password.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Delivery provider rejected the message.
    #[error("{channel} delivery failed ({status}): {message}")]
    Delivery {
        /// `sms` or `email`.
        channel: &'static str,
        /// HTTP status code.
        status: u16,
        /// Provider response body.
        message: String,
    },

    /// No email or phone number was supplied.
    #[error("Email or phone number is required")]
    MissingIdentifier,
}

/// Convenience type alias for auth results.
pub type Result<T> = std::result::Result<T, AuthError>;
