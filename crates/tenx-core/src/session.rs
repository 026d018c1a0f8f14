//! Sessions, masks and model configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INPUT_TEMPLATE, DEFAULT_LANG, DEFAULT_MASK_AVATAR, DEFAULT_MODEL, DEFAULT_PROVIDER,
    DEFAULT_TOPIC,
};
use crate::ids::{ChatId, MaskId};
use crate::messages::ChatMessage;

// ─────────────────────────────────────────────────────────────────────────────
// ModelConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound accepted for `max_tokens`.
pub const MAX_TOKENS_LIMIT: u32 = 512_000;

/// Per-session model parameters.
///
/// Sampling fields keep their snake_case wire names; everything else is
/// camelCase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// Model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Provider display name, e.g. `OpenAI`.
    pub provider_name: String,
    /// Sampling temperature, `[0, 2]`.
    pub temperature: f64,
    /// Nucleus sampling, `[0, 1]`.
    #[serde(rename = "top_p")]
    pub top_p: f64,
    /// Token budget for recent history and completion.
    #[serde(rename = "max_tokens")]
    pub max_tokens: u32,
    /// Presence penalty, `[-2, 2]`.
    #[serde(rename = "presence_penalty")]
    pub presence_penalty: f64,
    /// Frequency penalty, `[-2, 2]`.
    #[serde(rename = "frequency_penalty")]
    pub frequency_penalty: f64,
    /// Whether the long-term memory prompt is sent with requests.
    pub send_memory: bool,
    /// Number of recent messages considered for context.
    pub history_message_count: u32,
    /// Token cost above which history gets compressed into memory.
    pub compress_message_length_threshold: u32,
    /// Model used for summarization. Empty means automatic.
    pub compress_model: String,
    /// Provider of `compress_model`.
    pub compress_provider_name: String,
    /// Whether a synthesized system prompt is prepended for GPT models.
    pub enable_inject_system_prompts: bool,
    /// Template applied to user input.
    pub template: String,
    /// Image size for image models.
    pub size: String,
    /// Image quality for image models.
    pub quality: String,
    /// Image style for image models.
    pub style: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            provider_name: DEFAULT_PROVIDER.to_owned(),
            temperature: 0.5,
            top_p: 1.0,
            max_tokens: 4000,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            send_memory: true,
            history_message_count: 4,
            compress_message_length_threshold: 1000,
            compress_model: String::new(),
            compress_provider_name: String::new(),
            enable_inject_system_prompts: true,
            template: DEFAULT_INPUT_TEMPLATE.to_owned(),
            size: "1024x1024".to_owned(),
            quality: "standard".to_owned(),
            style: "vivid".to_owned(),
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

impl ModelConfig {
    /// Copy with every numeric field clamped into its accepted range.
    #[must_use]
    pub fn validated(&self) -> Self {
        Self {
            max_tokens: self.max_tokens.min(MAX_TOKENS_LIMIT),
            temperature: clamp_or(self.temperature, 0.0, 2.0, 1.0),
            top_p: clamp_or(self.top_p, 0.0, 1.0, 1.0),
            presence_penalty: clamp_or(self.presence_penalty, -2.0, 2.0, 0.0),
            frequency_penalty: clamp_or(self.frequency_penalty, -2.0, 2.0, 0.0),
            ..self.clone()
        }
    }

    /// Apply mask overrides on top of this (global) config. A field set in
    /// `overrides` wins; anything else keeps the global value.
    #[must_use]
    pub fn merged_with(&self, overrides: &ModelConfigOverrides) -> Self {
        let o = overrides.clone();
        Self {
            model: o.model.unwrap_or_else(|| self.model.clone()),
            provider_name: o.provider_name.unwrap_or_else(|| self.provider_name.clone()),
            temperature: o.temperature.unwrap_or(self.temperature),
            top_p: o.top_p.unwrap_or(self.top_p),
            max_tokens: o.max_tokens.unwrap_or(self.max_tokens),
            presence_penalty: o.presence_penalty.unwrap_or(self.presence_penalty),
            frequency_penalty: o.frequency_penalty.unwrap_or(self.frequency_penalty),
            send_memory: o.send_memory.unwrap_or(self.send_memory),
            history_message_count: o
                .history_message_count
                .unwrap_or(self.history_message_count),
            compress_message_length_threshold: o
                .compress_message_length_threshold
                .unwrap_or(self.compress_message_length_threshold),
            compress_model: o.compress_model.unwrap_or_else(|| self.compress_model.clone()),
            compress_provider_name: o
                .compress_provider_name
                .unwrap_or_else(|| self.compress_provider_name.clone()),
            enable_inject_system_prompts: o
                .enable_inject_system_prompts
                .unwrap_or(self.enable_inject_system_prompts),
            template: o.template.unwrap_or_else(|| self.template.clone()),
            size: o.size.unwrap_or_else(|| self.size.clone()),
            quality: o.quality.unwrap_or_else(|| self.quality.clone()),
            style: o.style.unwrap_or_else(|| self.style.clone()),
        }
    }
}

/// Sparse set of model parameters carried by a mask template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ModelConfigOverrides {
    pub model: Option<String>,
    pub provider_name: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "top_p")]
    pub top_p: Option<f64>,
    #[serde(rename = "max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(rename = "presence_penalty")]
    pub presence_penalty: Option<f64>,
    #[serde(rename = "frequency_penalty")]
    pub frequency_penalty: Option<f64>,
    pub send_memory: Option<bool>,
    pub history_message_count: Option<u32>,
    pub compress_message_length_threshold: Option<u32>,
    pub compress_model: Option<String>,
    pub compress_provider_name: Option<String>,
    pub enable_inject_system_prompts: Option<bool>,
    pub template: Option<String>,
    pub size: Option<String>,
    pub quality: Option<String>,
    pub style: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Mask
// ─────────────────────────────────────────────────────────────────────────────

/// Named template bundling a topic, static context prompts and model config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mask {
    /// Mask ID.
    pub id: MaskId,
    /// Avatar key.
    pub avatar: String,
    /// Display name, used as the topic of new sessions.
    pub name: String,
    /// Static prompts sent before the recent history.
    pub context: Vec<ChatMessage>,
    /// Whether the mask follows later changes to the global config.
    pub sync_global_config: bool,
    /// Effective model configuration.
    pub model_config: ModelConfig,
    /// Language code used for `{{lang}}`.
    pub lang: String,
    /// Whether the mask ships with the app.
    pub builtin: bool,
    /// Creation time, Unix milliseconds.
    pub created_at: i64,
}

impl Default for Mask {
    fn default() -> Self {
        Self::with_config(ModelConfig::default())
    }
}

impl Mask {
    /// Empty mask around the given model config.
    pub fn with_config(model_config: ModelConfig) -> Self {
        Self {
            id: MaskId::new(),
            avatar: DEFAULT_MASK_AVATAR.to_owned(),
            name: DEFAULT_TOPIC.to_owned(),
            context: Vec::new(),
            sync_global_config: true,
            model_config,
            lang: DEFAULT_LANG.to_owned(),
            builtin: false,
            created_at: crate::now_ms(),
        }
    }
}

/// Mask definition whose model config is sparse until instantiated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskTemplate {
    /// Display name.
    pub name: String,
    /// Avatar key. Empty means the default avatar.
    pub avatar: String,
    /// Static prompts.
    pub context: Vec<ChatMessage>,
    /// Fields that override the global config.
    pub model_config: ModelConfigOverrides,
    /// Language code. Empty means the default language.
    pub lang: String,
    /// Whether the mask ships with the app.
    pub builtin: bool,
}

impl MaskTemplate {
    /// Resolve the template against the global config.
    pub fn instantiate(&self, global: &ModelConfig) -> Mask {
        let mut mask = Mask::with_config(global.merged_with(&self.model_config));
        if !self.name.is_empty() {
            mask.name.clone_from(&self.name);
        }
        if !self.avatar.is_empty() {
            mask.avatar.clone_from(&self.avatar);
        }
        if !self.lang.is_empty() {
            mask.lang.clone_from(&self.lang);
        }
        mask.context.clone_from(&self.context);
        mask.builtin = self.builtin;
        mask
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChatSession
// ─────────────────────────────────────────────────────────────────────────────

/// Running counters for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatStat {
    /// Estimated tokens.
    pub token_count: u64,
    /// Whitespace-separated words.
    pub word_count: u64,
    /// Characters.
    pub char_count: u64,
}

/// One conversation thread.
///
/// `last_summarize_index` never exceeds `messages.len()`, and messages before
/// `clear_context_index` are excluded from context and memory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSession {
    /// Session ID, also the remote `chatId`.
    pub id: ChatId,
    /// Title.
    pub topic: String,
    /// Summary of older history.
    pub memory_prompt: String,
    /// Ordered history.
    pub messages: Vec<ChatMessage>,
    /// Counters.
    pub stat: ChatStat,
    /// Last mutation time, Unix milliseconds.
    pub last_update: i64,
    /// Message count covered by `memory_prompt`.
    pub last_summarize_index: usize,
    /// Context cut point set by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_context_index: Option<usize>,
    /// Template and model config of the session.
    pub mask: Mask,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::with_mask(Mask::default())
    }
}

impl ChatSession {
    /// Empty session with the default mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty session around a mask. The topic is the mask name.
    pub fn with_mask(mask: Mask) -> Self {
        Self {
            id: ChatId::new(),
            topic: if mask.name.is_empty() {
                DEFAULT_TOPIC.to_owned()
            } else {
                mask.name.clone()
            },
            memory_prompt: String::new(),
            messages: Vec::new(),
            stat: ChatStat::default(),
            last_update: crate::now_ms(),
            last_summarize_index: 0,
            clear_context_index: None,
            mask,
        }
    }

    /// Effective model config of the session.
    pub fn model_config(&self) -> &ModelConfig {
        &self.mask.model_config
    }

    /// Clamp bookkeeping indices into `0..=messages.len()`.
    pub fn clamp_indices(&mut self) {
        let len = self.messages.len();
        self.last_summarize_index = self.last_summarize_index.min(len);
        if let Some(idx) = self.clear_context_index {
            self.clear_context_index = Some(idx.min(len));
        }
    }

    /// Clear history, memory and counters.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.memory_prompt.clear();
        self.last_summarize_index = 0;
        self.clear_context_index = None;
        self.stat = ChatStat::default();
        self.last_update = crate::now_ms();
    }

    /// Whether the session still carries the placeholder topic.
    pub fn has_default_topic(&self) -> bool {
        self.topic == DEFAULT_TOPIC
    }
}
