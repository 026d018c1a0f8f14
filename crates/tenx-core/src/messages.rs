//! Chat message types.
//!
//! A [`ChatMessage`] is one turn in a session. Content is either plain text
//! or a list of multimodal parts (text and image URLs). Messages serialize in
//! the camelCase shape the web client stores and syncs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::MessageId;

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Speaker of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction injected by the system (prompts, memory).
    System,
    /// Human input.
    User,
    /// Model output.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content
// ─────────────────────────────────────────────────────────────────────────────

/// Image reference inside a multimodal part.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Data URL or remote URL.
    pub url: String,
}

/// One part of multimodal content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text fragment.
    Text {
        /// The text.
        text: String,
    },
    /// Image attachment.
    ImageUrl {
        /// The image reference.
        image_url: ImageUrl,
    },
}

/// Message body: plain text or a list of parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Multimodal parts.
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl MessageContent {
    /// Text of the content. Multimodal parts contribute their text fragments
    /// joined in order; images are ignored.
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// URLs of image parts, in order.
    pub fn image_urls(&self) -> Vec<&str> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }

    /// Build content from text plus optional images. Without images the
    /// result is plain text.
    pub fn with_images(text: impl Into<String>, images: &[String]) -> Self {
        let text = text.into();
        if images.is_empty() {
            return Self::Text(text);
        }
        let mut parts = vec![ContentPart::Text { text }];
        parts.extend(images.iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.clone() },
        }));
        Self::Parts(parts)
    }

    /// Whether there is no text and no image.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A tool invocation reported alongside an assistant message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatMessageTool {
    /// Tool call ID.
    pub id: String,
    /// Tool call index within the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Tool call type (usually `function`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Called function name and arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<serde_json::Value>,
    /// Tool output, once available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether the tool reported an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Human readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// One turn in a chat session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message ID.
    pub id: MessageId,
    /// Speaker.
    pub role: Role,
    /// Body.
    #[serde(default)]
    pub content: MessageContent,
    /// Creation time (RFC 3339).
    #[serde(default)]
    pub date: String,
    /// Whether the model is still streaming into this message.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub streaming: bool,
    /// Whether the turn failed. Error messages are excluded from context.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    /// Model that produced an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Tool calls attached to the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatMessageTool>,
    /// Synthesized speech for the message.
    #[serde(default, rename = "audio_url", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl ChatMessage {
    /// Create a message with a fresh ID dated now.
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            date: chrono::Utc::now().to_rfc3339(),
            streaming: false,
            is_error: false,
            model: None,
            tools: Vec::new(),
            audio_url: None,
        }
    }

    /// User message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// System message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// Text of the message, ignoring images.
    pub fn text_content(&self) -> String {
        self.content.text()
    }

    /// Image URLs attached to the message.
    pub fn image_urls(&self) -> Vec<&str> {
        self.content.image_urls()
    }

    /// Copy of the message with a new identity, used when forking sessions.
    #[must_use]
    pub fn with_new_id(&self) -> Self {
        Self {
            id: MessageId::new(),
            ..self.clone()
        }
    }
}
