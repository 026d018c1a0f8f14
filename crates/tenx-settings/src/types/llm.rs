//! Model provider endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One OpenAI-compatible endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Base URL, without the `/v1/chat/completions` suffix.
    pub base_url: String,
    /// Bearer token. Empty sends no `Authorization` header.
    pub api_key: String,
    /// Path appended to `base_url` for chat completions.
    pub chat_path: String,
}

/// Model provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Endpoints keyed by provider name (matched case-insensitively).
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        let _ = providers.insert(
            "openai".to_string(),
            ProviderSettings {
                base_url: "https://api.openai.com".to_string(),
                api_key: String::new(),
                chat_path: "/v1/chat/completions".to_string(),
            },
        );
        let _ = providers.insert(
            "google".to_string(),
            ProviderSettings {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                api_key: String::new(),
                chat_path: "/v1beta/openai/chat/completions".to_string(),
            },
        );
        Self {
            providers,
            request_timeout_ms: 120_000,
        }
    }
}
