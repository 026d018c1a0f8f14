//! # tenx-settings
//!
//! Layered configuration for the tenx chat service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TenxSettings::default()`]
//! 2. **User file**: `~/.tenx/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TENX_*` and provider keys (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, resolve_path, settings_path, tenx_home,
};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<TenxSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.tenx/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static TenxSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TenxSettings) -> std::result::Result<(), TenxSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = TenxSettings::default();
        assert!(settings_path().ends_with(".tenx/settings.json"));
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = TenxSettings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.otp.ttl_secs, 600);
        assert_eq!(settings.chat.model_config.model, "gpt-4o-mini");
        assert_eq!(settings.logging.level, "info");
    }
}
