//! # tenx-core
//!
//! Foundation types, branded IDs, and utilities for the tenx chat service.
//!
//! This crate provides the shared vocabulary that every other tenx crate
//! depends on:
//!
//! - **Branded IDs**: `ChatId`, `MessageId`, `UserId`, `MaskId` as newtypes
//! - **Messages**: [`messages::ChatMessage`] with text or multimodal content
//! - **Sessions**: [`session::ChatSession`], [`session::Mask`] and the
//!   per-session [`session::ModelConfig`]
//! - **Chat logs**: the server-side mirror of a session ([`chat_log::ChatLog`])
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod chat_log;
pub mod constants;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod session;
pub mod text;

pub use chat_log::{
    ChatLog, ChatLogMessage, ChatLogPage, ChatLogPayload, Pagination, TokenUsage, TokenUsageInput,
};
pub use ids::{ChatId, MaskId, MessageId, UserId};
pub use messages::{ChatMessage, ChatMessageTool, ContentPart, MessageContent, Role};
pub use session::{ChatSession, ChatStat, Mask, ModelConfig};

/// Current wall-clock time as Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
