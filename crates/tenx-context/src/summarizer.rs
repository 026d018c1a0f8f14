//! Summarization planning: session titles and memory compression.
//!
//! Both operations are planned here from a session snapshot and executed by
//! the caller. A plan carries the exact messages to send and the model to
//! send them to; applying the result back is done through the plan so the
//! bookkeeping captured at trigger time is what gets committed.

use tenx_core::constants::{DEFAULT_TOPIC, GEMINI_SUMMARIZE_MODEL, SUMMARIZE_MODEL};
use tenx_core::messages::ChatMessage;
use tenx_core::session::{ChatSession, ModelConfig};
use tenx_core::text::trim_topic;
use tenx_llm::{ChatCompletion, ChatRequest};
use tenx_tokens::count_messages;
use tracing::debug;

use crate::assembler::memory_prompt_message;
use crate::constants::{
    FALLBACK_MAX_TOKENS, IMAGE_MODEL_PREFIXES, SUMMARIZE_PROMPT, TITLE_MIN_TOKENS, TOPIC_PROMPT,
};

// ─────────────────────────────────────────────────────────────────────────────
// Model selection
// ─────────────────────────────────────────────────────────────────────────────

/// Model and provider used for summarization calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummarizeModel {
    /// Model name.
    pub model: String,
    /// Provider name.
    pub provider: String,
}

/// Whether `model` only generates images. Such sessions are never summarized.
pub fn is_image_model(model: &str) -> bool {
    IMAGE_MODEL_PREFIXES.iter().any(|p| model.starts_with(p))
}

/// Pick the summarization model for a session config.
///
/// An explicit `compress_model` wins. Otherwise GPT models use the
/// lightweight summarizer when it is available, Gemini models use the Gemini
/// summarizer, and anything else summarizes with itself.
pub fn select_summarize_model(config: &ModelConfig, available_models: &[String]) -> SummarizeModel {
    if !config.compress_model.is_empty() {
        let provider = if config.compress_provider_name.is_empty() {
            config.provider_name.clone()
        } else {
            config.compress_provider_name.clone()
        };
        return SummarizeModel {
            model: config.compress_model.clone(),
            provider,
        };
    }

    let model = config.model.as_str();
    if model.starts_with("gpt") || model.starts_with("chatgpt") {
        if available_models.iter().any(|m| m == SUMMARIZE_MODEL) {
            return SummarizeModel {
                model: SUMMARIZE_MODEL.to_string(),
                provider: "OpenAI".to_string(),
            };
        }
    } else if model.starts_with("gemini") {
        return SummarizeModel {
            model: GEMINI_SUMMARIZE_MODEL.to_string(),
            provider: "Google".to_string(),
        };
    }

    SummarizeModel {
        model: config.model.clone(),
        provider: config.provider_name.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Title
// ─────────────────────────────────────────────────────────────────────────────

/// A planned title generation call.
#[derive(Clone, Debug, PartialEq)]
pub struct TitlePlan {
    /// Recent history followed by the topic instruction.
    pub messages: Vec<ChatMessage>,
    /// Model to call.
    pub model: SummarizeModel,
}

impl TitlePlan {
    /// Non-streaming request for the plan.
    pub fn request(&self, config: &ModelConfig) -> ChatRequest {
        ChatRequest::from_config(&self.messages, config, false)
            .with_model(&self.model.model, &self.model.provider)
    }

    /// Topic to store for a completed call, or `None` when the call did not
    /// succeed. An empty answer resets the placeholder topic.
    pub fn topic_from(&self, completion: &ChatCompletion) -> Option<String> {
        if !completion.is_ok() {
            return None;
        }
        let topic = trim_topic(&completion.content);
        Some(if topic.is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            topic
        })
    }
}

/// Plan a title call, if one is due.
///
/// Due when auto titling is on, the topic is still the placeholder and the
/// whole history is estimated at [`TITLE_MIN_TOKENS`] or more; or always when
/// `refresh` is set.
pub fn plan_title(
    session: &ChatSession,
    auto_title: bool,
    refresh: bool,
    model: &SummarizeModel,
) -> Option<TitlePlan> {
    let due = auto_title
        && session.has_default_topic()
        && count_messages(&session.messages) >= TITLE_MIN_TOKENS;
    if !(due || refresh) {
        return None;
    }

    let len = session.messages.len();
    let history = usize::try_from(session.model_config().history_message_count).unwrap_or(usize::MAX);
    let mut start = len.saturating_sub(history);
    if start >= len {
        start = len.saturating_sub(1);
    }

    let mut messages: Vec<ChatMessage> = session.messages[start..].to_vec();
    messages.push(ChatMessage::user(TOPIC_PROMPT));
    debug!(session_id = %session.id, refresh, sent = messages.len(), "planning title");
    Some(TitlePlan {
        messages,
        model: model.clone(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory compression
// ─────────────────────────────────────────────────────────────────────────────

/// A planned memory compression call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressionPlan {
    /// Memory message (if any), the history window, then the instruction.
    pub messages: Vec<ChatMessage>,
    /// Model to call.
    pub model: SummarizeModel,
    /// Message count at trigger time. Committed as `last_summarize_index`.
    pub summarize_until: usize,
    /// Estimated tokens of the window before truncation.
    pub window_tokens: u64,
}

impl CompressionPlan {
    /// Streaming request for the plan, without a completion budget.
    pub fn request(&self, config: &ModelConfig) -> ChatRequest {
        ChatRequest::from_config(&self.messages, config, true)
            .with_model(&self.model.model, &self.model.provider)
    }

    /// Store a finished summary on the session.
    pub fn commit(&self, session: &mut ChatSession, summary: &str) {
        session.memory_prompt = summary.to_string();
        session.last_summarize_index = self.summarize_until.min(session.messages.len());
    }
}

/// Plan a compression call, if one is due.
///
/// The window starts at `max(last_summarize_index, clear_context_index)` and
/// skips failed turns. A window costlier than `max_tokens` is cut down to the
/// last `history_message_count` messages. Compression is due when the window
/// costs more than `compress_message_length_threshold` and memory is enabled.
pub fn plan_compression(session: &ChatSession, model: &SummarizeModel) -> Option<CompressionPlan> {
    let config = session.model_config();
    let len = session.messages.len();
    let clear = session.clear_context_index.unwrap_or(0);
    let summarize_index = session.last_summarize_index.max(clear).min(len);

    let mut window: Vec<ChatMessage> = session.messages[summarize_index..]
        .iter()
        .filter(|m| !m.is_error)
        .cloned()
        .collect();
    let window_tokens = count_messages(&window);

    let max_tokens = if config.max_tokens == 0 {
        FALLBACK_MAX_TOKENS
    } else {
        config.max_tokens
    };
    if window_tokens > u64::from(max_tokens) {
        let history =
            usize::try_from(config.history_message_count).unwrap_or(usize::MAX);
        let keep_from = window.len().saturating_sub(history);
        let _ = window.drain(..keep_from);
    }

    if !(config.send_memory
        && window_tokens > u64::from(config.compress_message_length_threshold))
    {
        return None;
    }

    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.extend(memory_prompt_message(session));
    messages.extend(window);
    messages.push(ChatMessage::system(SUMMARIZE_PROMPT));

    debug!(
        session_id = %session.id,
        window_tokens,
        threshold = config.compress_message_length_threshold,
        "planning memory compression"
    );
    Some(CompressionPlan {
        messages,
        model: model.clone(),
        summarize_until: len,
        window_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenx_core::messages::Role;

    fn msg(role: Role, tokens: usize) -> ChatMessage {
        ChatMessage::new(role, "a".repeat(tokens * 4))
    }

    fn session_with(n: usize, tokens_each: usize, config: ModelConfig) -> ChatSession {
        let mut s = ChatSession::new();
        s.mask.model_config = config;
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            s.messages.push(msg(role, tokens_each));
        }
        s
    }

    fn available() -> Vec<String> {
        vec!["gpt-4o-mini".into(), "gpt-4o".into()]
    }

    fn mini() -> SummarizeModel {
        SummarizeModel {
            model: "gpt-4o-mini".into(),
            provider: "OpenAI".into(),
        }
    }

    // ── model selection ─────────────────────────────────────────────

    #[test]
    fn explicit_compress_model_wins() {
        let config = ModelConfig {
            compress_model: "gpt-3.5-turbo".into(),
            compress_provider_name: "openai".into(),
            ..ModelConfig::default()
        };
        let m = select_summarize_model(&config, &available());
        assert_eq!(m.model, "gpt-3.5-turbo");
        assert_eq!(m.provider, "openai");
    }

    #[test]
    fn gpt_models_use_lightweight_summarizer_when_available() {
        let config = ModelConfig {
            model: "gpt-4o".into(),
            ..ModelConfig::default()
        };
        assert_eq!(select_summarize_model(&config, &available()), mini());

        let fallback = select_summarize_model(&config, &[]);
        assert_eq!(fallback.model, "gpt-4o");
    }

    #[test]
    fn gemini_models_use_gemini_summarizer() {
        let config = ModelConfig {
            model: "gemini-1.5-pro".into(),
            provider_name: "Google".into(),
            ..ModelConfig::default()
        };
        let m = select_summarize_model(&config, &available());
        assert_eq!(m.model, "gemini-pro");
        assert_eq!(m.provider, "Google");
    }

    #[test]
    fn other_models_summarize_with_themselves() {
        let config = ModelConfig {
            model: "claude-3-haiku".into(),
            provider_name: "Anthropic".into(),
            ..ModelConfig::default()
        };
        let m = select_summarize_model(&config, &available());
        assert_eq!(m.model, "claude-3-haiku");
        assert_eq!(m.provider, "Anthropic");
    }

    #[test]
    fn image_models_are_detected() {
        assert!(is_image_model("dall-e-3"));
        assert!(!is_image_model("gpt-4o"));
    }

    // ── title ───────────────────────────────────────────────────────

    #[test]
    fn title_due_at_fifty_tokens() {
        let s = session_with(2, 25, ModelConfig::default());
        let plan = plan_title(&s, true, false, &mini()).unwrap();
        assert_eq!(plan.messages.len(), 3);
        assert_eq!(plan.messages[2].text_content(), TOPIC_PROMPT);
        assert_eq!(plan.messages[2].role, Role::User);

        let short = session_with(2, 24, ModelConfig::default());
        assert!(plan_title(&short, true, false, &mini()).is_none());
    }

    #[test]
    fn title_not_due_once_titled_or_disabled() {
        let mut s = session_with(4, 50, ModelConfig::default());
        assert!(plan_title(&s, false, false, &mini()).is_none());
        s.topic = "Rust Lifetimes".into();
        assert!(plan_title(&s, true, false, &mini()).is_none());
        assert!(plan_title(&s, true, true, &mini()).is_some());
    }

    #[test]
    fn title_sends_last_history_messages() {
        let s = session_with(10, 10, ModelConfig::default());
        let plan = plan_title(&s, true, false, &mini()).unwrap();
        // history_message_count = 4, plus the instruction
        assert_eq!(plan.messages.len(), 5);
        assert_eq!(plan.messages[0].id, s.messages[6].id);
    }

    #[test]
    fn title_with_zero_history_sends_last_message() {
        let config = ModelConfig {
            history_message_count: 0,
            ..ModelConfig::default()
        };
        let s = session_with(3, 30, config);
        let plan = plan_title(&s, true, false, &mini()).unwrap();
        assert_eq!(plan.messages.len(), 2);
        assert_eq!(plan.messages[0].id, s.messages[2].id);
    }

    #[test]
    fn topic_from_completion() {
        let s = session_with(2, 30, ModelConfig::default());
        let plan = plan_title(&s, true, false, &mini()).unwrap();
        let ok = |content: &str| ChatCompletion {
            content: content.into(),
            status: 200,
            tools: Vec::new(),
        };
        assert_eq!(
            plan.topic_from(&ok("\"Borrowing Rules Explained\"")).as_deref(),
            Some("Borrowing Rules Explained")
        );
        assert_eq!(plan.topic_from(&ok("")).as_deref(), Some(DEFAULT_TOPIC));
        let failed = ChatCompletion {
            status: 500,
            ..ok("x")
        };
        assert!(plan.topic_from(&failed).is_none());
    }

    #[test]
    fn title_request_is_not_streamed() {
        let s = session_with(2, 30, ModelConfig::default());
        let plan = plan_title(&s, true, false, &mini()).unwrap();
        let req = plan.request(s.model_config());
        assert!(!req.stream);
        assert_eq!(req.model, "gpt-4o-mini");
    }

    // ── compression ─────────────────────────────────────────────────

    fn compress_config() -> ModelConfig {
        ModelConfig {
            compress_message_length_threshold: 100,
            max_tokens: 4000,
            history_message_count: 4,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn compression_due_above_threshold() {
        let s = session_with(6, 20, compress_config());
        let plan = plan_compression(&s, &mini()).unwrap();
        assert_eq!(plan.window_tokens, 120);
        assert_eq!(plan.summarize_until, 6);
        assert_eq!(plan.messages.len(), 7);
        assert_eq!(plan.messages[6].text_content(), SUMMARIZE_PROMPT);
        assert_eq!(plan.messages[6].role, Role::System);
    }

    #[test]
    fn compression_not_due_at_or_below_threshold() {
        let s = session_with(5, 20, compress_config());
        assert!(plan_compression(&s, &mini()).is_none());
    }

    #[test]
    fn compression_requires_send_memory() {
        let config = ModelConfig {
            send_memory: false,
            ..compress_config()
        };
        let s = session_with(10, 20, config);
        assert!(plan_compression(&s, &mini()).is_none());
    }

    #[test]
    fn compression_window_starts_after_last_summary() {
        let mut s = session_with(10, 20, compress_config());
        s.memory_prompt = "old summary".into();
        // 5 messages left after index 5 cost exactly the threshold
        s.last_summarize_index = 5;
        assert!(plan_compression(&s, &mini()).is_none());

        s.last_summarize_index = 4;
        let plan = plan_compression(&s, &mini()).unwrap();
        assert_eq!(plan.window_tokens, 120);
        assert_eq!(plan.messages[1].id, s.messages[4].id);
    }

    #[test]
    fn compression_prepends_memory_and_skips_errors() {
        let mut s = session_with(10, 20, compress_config());
        s.last_summarize_index = 2;
        s.memory_prompt = "old summary".into();
        s.messages[9].is_error = true;
        let plan = plan_compression(&s, &mini()).unwrap();
        // 7 non-error messages from index 2, 140 tokens
        assert_eq!(plan.window_tokens, 140);
        assert_eq!(plan.messages.len(), 1 + 7 + 1);
        assert!(plan.messages[0].text_content().ends_with("old summary"));
        assert!(plan.messages.iter().all(|m| !m.is_error));
    }

    #[test]
    fn oversized_window_is_cut_to_history_count() {
        let config = ModelConfig {
            max_tokens: 100,
            ..compress_config()
        };
        let s = session_with(10, 20, config);
        let plan = plan_compression(&s, &mini()).unwrap();
        assert_eq!(plan.window_tokens, 200);
        // last 4 messages plus the instruction
        assert_eq!(plan.messages.len(), 5);
        assert_eq!(plan.messages[0].id, s.messages[6].id);
    }

    #[test]
    fn clear_context_index_bounds_window() {
        let mut s = session_with(10, 20, compress_config());
        s.clear_context_index = Some(8);
        assert!(plan_compression(&s, &mini()).is_none());
    }

    #[test]
    fn commit_advances_to_trigger_time_count() {
        let mut s = session_with(6, 20, compress_config());
        let plan = plan_compression(&s, &mini()).unwrap();
        s.messages.push(msg(Role::User, 5));
        s.messages.push(msg(Role::Assistant, 5));
        plan.commit(&mut s, "new summary");
        assert_eq!(s.memory_prompt, "new summary");
        assert_eq!(s.last_summarize_index, 6);
    }

    #[test]
    fn commit_never_exceeds_message_count() {
        let mut s = session_with(6, 20, compress_config());
        let plan = plan_compression(&s, &mini()).unwrap();
        s.messages.clear();
        plan.commit(&mut s, "summary");
        assert_eq!(s.last_summarize_index, 0);
    }

    #[test]
    fn compression_request_streams_without_budget() {
        let s = session_with(6, 20, compress_config());
        let plan = plan_compression(&s, &mini()).unwrap();
        let req = plan.request(s.model_config());
        assert!(req.stream);
        assert!(req.max_tokens.is_none());
    }
}
