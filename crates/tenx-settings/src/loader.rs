//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TenxSettings::default()`]
//! 2. If `~/.tenx/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{Environment, TenxSettings};

/// Resolve the settings directory (`~/.tenx`).
pub fn tenx_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tenx")
}

/// Resolve the path to the settings file (`~/.tenx/settings.json`).
pub fn settings_path() -> PathBuf {
    tenx_home().join("settings.json")
}

/// Resolve a configured path against `~/.tenx` unless it is absolute.
pub fn resolve_path(configured: &str) -> PathBuf {
    let p = PathBuf::from(configured);
    if p.is_absolute() { p } else { tenx_home().join(p) }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TenxSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TenxSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<TenxSettings> {
    let defaults = serde_json::to_value(TenxSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut TenxSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`. Split out so tests can feed a map
/// instead of the process environment.
pub fn apply_overrides<F>(settings: &mut TenxSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("TENX_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("TENX_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("TENX_DB_PATH") {
        settings.server.database_path = v;
    }
    if let Some(v) = env.u64("TENX_POOL_SIZE", 1, 256) {
        settings.server.pool_size = u32::try_from(v).unwrap_or(settings.server.pool_size);
    }
    if let Some(v) = env.string("TENX_ENV") {
        match parse_environment(&v) {
            Some(e) => settings.server.environment = e,
            None => tracing::warn!(key = "TENX_ENV", value = %v, "invalid environment, ignoring"),
        }
    }
    if let Some(v) = env.usize("TENX_BODY_LIMIT", 1024, 64 * 1024 * 1024) {
        settings.server.body_limit_bytes = v;
    }

    // ── Chat ────────────────────────────────────────────────────────
    if let Some(v) = env.string("TENX_DEFAULT_MODEL") {
        settings.chat.model_config.model = v;
    }
    if let Some(v) = env.u64("TENX_HISTORY_MESSAGE_COUNT", 0, 64) {
        settings.chat.model_config.history_message_count =
            u32::try_from(v).unwrap_or(settings.chat.model_config.history_message_count);
    }
    if let Some(v) = env.bool("TENX_AUTO_TITLE") {
        settings.chat.enable_auto_generate_title = v;
    }
    if let Some(v) = env.string("TENX_STATE_PATH") {
        settings.chat.state_path = v;
    }

    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = env.string("OPENAI_API_KEY") {
        settings.llm.providers.entry("openai".to_string()).or_default().api_key = v;
    }
    if let Some(v) = env.string("OPENAI_BASE_URL") {
        settings.llm.providers.entry("openai".to_string()).or_default().base_url = v;
    }
    if let Some(v) = env.string("GOOGLE_API_KEY") {
        settings.llm.providers.entry("google".to_string()).or_default().api_key = v;
    }
    if let Some(v) = env.u64("TENX_LLM_TIMEOUT_MS", 1000, 3_600_000) {
        settings.llm.request_timeout_ms = v;
    }

    // ── Sync ────────────────────────────────────────────────────────
    if let Some(v) = env.bool("TENX_SYNC_ENABLED") {
        settings.sync.enabled = v;
    }
    if let Some(v) = env.string("TENX_SYNC_URL") {
        settings.sync.api_base_url = v;
    }
    if let Some(v) = env.string("TENX_USER_ID") {
        settings.sync.user_id = Some(v);
    }

    // ── OTP ─────────────────────────────────────────────────────────
    if let Some(v) = env.u64("TENX_OTP_TTL_SECS", 30, 86_400) {
        settings.otp.ttl_secs = v;
    }
    if let Some(v) = env.string("TWILIO_ACCOUNT_SID") {
        settings.otp.twilio.account_sid = v;
    }
    if let Some(v) = env.string("TWILIO_AUTH_TOKEN") {
        settings.otp.twilio.auth_token = v;
    }
    if let Some(v) = env.string("TWILIO_PHONE_NUMBER") {
        settings.otp.twilio.from_number = v;
    }
    if let Some(v) = env.string("TENX_MAIL_ENDPOINT") {
        settings.otp.mail.endpoint = v;
    }
    if let Some(v) = env.string("TENX_MAIL_API_KEY") {
        settings.otp.mail.api_key = v;
    }
    if let Some(v) = env.string("TENX_MAIL_FROM") {
        settings.otp.mail.from_address = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("TENX_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("TENX_LOG_FORMAT") {
        if let Ok(format) = serde_json::from_value(Value::String(v)) {
            settings.logging.format = format;
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a deployment environment name. `prod`/`dev` are accepted.
pub fn parse_environment(val: &str) -> Option<Environment> {
    match val.to_lowercase().as_str() {
        "production" | "prod" => Some(Environment::Production),
        "development" | "dev" => Some(Environment::Development),
        "test" => Some(Environment::Test),
        _ => None,
    }
}

// ── Env readers (thin wrappers) ─────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = (self.lookup)(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = (self.lookup)(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
