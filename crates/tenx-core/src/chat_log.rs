//! Remote chat log record: the server-side mirror of a [`ChatSession`].
//!
//! The record is keyed by `chatId == session.id` and scoped to the principal
//! that created it. The client writes it through [`ChatLogPayload`] and reads
//! it back with [`ChatSession::from_chat_log`].

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TOPIC;
use crate::ids::{ChatId, MessageId, UserId};
use crate::messages::{ChatMessage, ChatMessageTool, MessageContent, Role};
use crate::session::{ChatSession, ChatStat, Mask};

/// Token accounting attached to a chat log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenUsage {
    /// Tokens sent to the model.
    pub prompt_tokens: u64,
    /// Tokens produced by the model.
    pub completion_tokens: u64,
    /// Sum of both.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage from prompt and completion counts.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Usage reported as a single budget number. The whole budget counts as
    /// prompt tokens.
    pub fn from_budget(budget: u64) -> Self {
        Self::new(budget, 0)
    }
}

/// Token usage as accepted on the wire: either a bare number or the full
/// object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenUsageInput {
    /// A single number (the sync path sends the `max_tokens` budget).
    Budget(u64),
    /// Structured usage.
    Usage(TokenUsage),
}

impl From<TokenUsageInput> for TokenUsage {
    fn from(input: TokenUsageInput) -> Self {
        match input {
            TokenUsageInput::Budget(n) => Self::from_budget(n),
            TokenUsageInput::Usage(u) => u,
        }
    }
}

/// One message as stored in a chat log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogMessage {
    /// Message ID.
    pub id: MessageId,
    /// Speaker.
    pub role: Role,
    /// Body.
    #[serde(default)]
    pub content: MessageContent,
    /// Creation time (RFC 3339).
    #[serde(default)]
    pub timestamp: String,
    /// Whether the turn failed.
    #[serde(default)]
    pub is_error: bool,
    /// Tool calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatMessageTool>,
    /// Synthesized speech.
    #[serde(default, rename = "audio_url", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl From<&ChatMessage> for ChatLogMessage {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id.clone(),
            role: m.role,
            content: m.content.clone(),
            timestamp: m.date.clone(),
            is_error: m.is_error,
            tools: m.tools.clone(),
            audio_url: m.audio_url.clone(),
        }
    }
}

impl From<ChatLogMessage> for ChatMessage {
    fn from(m: ChatLogMessage) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content,
            date: m.timestamp,
            streaming: false,
            is_error: m.is_error,
            model: None,
            tools: m.tools,
            audio_url: m.audio_url,
        }
    }
}

/// A persisted chat log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLog {
    /// Session ID.
    pub chat_id: ChatId,
    /// Owning principal.
    pub user_id: UserId,
    /// Model used by the session.
    pub model_id: String,
    /// Session title.
    pub topic: String,
    /// History.
    #[serde(default)]
    pub messages: Vec<ChatLogMessage>,
    /// Token accounting.
    #[serde(default)]
    pub token_usage: TokenUsage,
    /// Accumulated cost.
    #[serde(default)]
    pub cost: f64,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last patch time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of a create or patch request. Absent fields are left untouched on
/// patch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ChatLogPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatLogMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsageInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ChatLogPayload {
    /// Payload mirroring a session. Usage is reported as the session's
    /// `max_tokens` budget and cost as zero, which is what the remote mirror
    /// has always received.
    pub fn from_session(session: &ChatSession) -> Self {
        Self {
            chat_id: Some(session.id.clone()),
            messages: Some(session.messages.iter().map(ChatLogMessage::from).collect()),
            model_id: Some(session.mask.model_config.model.clone()),
            topic: Some(session.topic.clone()),
            token_usage: Some(TokenUsageInput::Budget(u64::from(
                session.mask.model_config.max_tokens,
            ))),
            cost: Some(0.0),
            updated_at: None,
        }
    }

    /// Same as [`Self::from_session`] with `updatedAt` stamped and without
    /// the key, as sent on patch.
    #[must_use]
    pub fn into_patch(mut self) -> Self {
        self.chat_id = None;
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self
    }
}

/// Paging metadata of a chat log listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Records owned by the principal.
    pub total: u64,
    /// Records skipped.
    pub offset: u32,
    /// Page size.
    pub limit: u32,
}

/// One page of chat logs, newest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogPage {
    /// Records on this page.
    pub chat_logs: Vec<ChatLog>,
    /// Paging metadata.
    pub pagination: Pagination,
}

impl ChatSession {
    /// Rebuild a local session from a remote log, using `mask` for model
    /// configuration.
    pub fn from_chat_log(log: ChatLog, mask: Mask) -> Self {
        let last_update = chrono::DateTime::parse_from_rfc3339(&log.created_at)
            .map_or_else(|_| crate::now_ms(), |d| d.timestamp_millis());
        Self {
            id: log.chat_id,
            topic: if log.topic.is_empty() {
                DEFAULT_TOPIC.to_owned()
            } else {
                log.topic
            },
            memory_prompt: String::new(),
            messages: log.messages.into_iter().map(ChatMessage::from).collect(),
            stat: ChatStat {
                token_count: log.token_usage.total_tokens,
                ..ChatStat::default()
            },
            last_update,
            last_summarize_index: 0,
            clear_context_index: None,
            mask,
        }
    }
}
