//! Chat behaviour and client-side sync settings.

use serde::{Deserialize, Serialize};
use tenx_core::session::ModelConfig;

/// Global chat defaults applied to new sessions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Global model configuration. Masks override individual fields.
    pub model_config: ModelConfig,
    /// Whether titles are generated once a session grows long enough.
    pub enable_auto_generate_title: bool,
    /// Models the deployment can reach. Summarization falls back to the
    /// chat model when the preferred summarizer is not listed.
    pub available_models: Vec<String>,
    /// How long a deleted session can be restored, in milliseconds.
    pub undo_delete_ms: u64,
    /// Where the client persists its local state.
    pub state_path: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model_config: ModelConfig::default(),
            enable_auto_generate_title: true,
            available_models: vec![
                "gpt-4o-mini".to_string(),
                "gpt-4o".to_string(),
                "gpt-3.5-turbo".to_string(),
                "gemini-pro".to_string(),
                "dall-e-3".to_string(),
            ],
            undo_delete_ms: 5000,
            state_path: "chat-state.json".to_string(),
        }
    }
}

/// Client-to-server sync settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Whether sessions are mirrored to the server.
    pub enabled: bool,
    /// Base URL of the chat-log API.
    pub api_base_url: String,
    /// Principal sent in the `user-id` header. No principal disables sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base_url: "http://127.0.0.1:3000".to_string(),
            user_id: None,
            timeout_ms: 10_000,
        }
    }
}
