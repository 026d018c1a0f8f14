//! Route handlers, one module per resource.

pub mod auth;
pub mod chat_logs;
pub mod configurations;
pub mod user_settings;

use serde::Serialize;

/// `{data, timestamp}` envelope used by the user settings resource.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Payload.
    pub data: T,
    /// When the response was produced (RFC 3339).
    pub timestamp: String,
}

impl<T> Envelope<T> {
    /// Wrap `data` stamped now.
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
