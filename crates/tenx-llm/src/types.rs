//! Request, event and completion types.

use serde::{Deserialize, Serialize};
use tenx_core::messages::{ChatMessage, ChatMessageTool, MessageContent, Role};
use tenx_core::session::ModelConfig;

/// A message as sent to the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Speaker.
    pub role: Role,
    /// Body.
    pub content: MessageContent,
}

impl From<&ChatMessage> for RequestMessage {
    fn from(m: &ChatMessage) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
        }
    }
}

/// One chat completion request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Conversation to complete.
    pub messages: Vec<RequestMessage>,
    /// Model name.
    pub model: String,
    /// Provider name used for routing. Not sent on the wire.
    #[serde(skip)]
    pub provider: String,
    /// Whether to stream.
    pub stream: bool,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Completion budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Presence penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
}

impl ChatRequest {
    /// Request carrying the sampling parameters of `config`. `max_tokens` is
    /// left unset, matching how the chat flow calls models.
    pub fn from_config(messages: &[ChatMessage], config: &ModelConfig, stream: bool) -> Self {
        let config = config.validated();
        Self {
            messages: messages.iter().map(RequestMessage::from).collect(),
            model: config.model.clone(),
            provider: config.provider_name.clone(),
            stream,
            temperature: Some(config.temperature),
            top_p: Some(config.top_p),
            max_tokens: None,
            presence_penalty: Some(config.presence_penalty),
            frequency_penalty: Some(config.frequency_penalty),
        }
    }

    /// Route the request to another model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, provider: impl Into<String>) -> Self {
        self.model = model.into();
        self.provider = provider.into();
        self
    }
}

/// Progress reported while a call is in flight.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// New text arrived.
    Update {
        /// Full text so far.
        message: String,
        /// Text added by this update.
        chunk: String,
    },
    /// A tool call finished streaming its arguments.
    Tool(ChatMessageTool),
}

/// Final outcome of a successful call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatCompletion {
    /// Full response text.
    pub content: String,
    /// HTTP status of the response.
    pub status: u16,
    /// Tool calls made by the model.
    pub tools: Vec<ChatMessageTool>,
}

impl ChatCompletion {
    /// Whether the provider answered 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
