//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their default value.

mod chat;
mod llm;
mod otp;
mod server;

pub use chat::*;
pub use llm::*;
pub use otp::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use tenx_core::logging::LogFormat;

/// Root settings type.
///
/// Loaded from `~/.tenx/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenxSettings {
    /// HTTP server.
    pub server: ServerSettings,
    /// Chat defaults.
    pub chat: ChatSettings,
    /// Model providers.
    pub llm: LlmSettings,
    /// Client sync.
    pub sync: SyncSettings,
    /// OTP issuance and delivery.
    pub otp: OtpSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`..`error`). `RUST_LOG` wins when set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
