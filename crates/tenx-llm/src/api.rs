//! The model call abstraction.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::types::{ChatCompletion, ChatEvent, ChatRequest};

/// Callback receiving progress events. Called on every transport chunk,
/// without batching.
pub type EventSink<'a> = &'a (dyn Fn(ChatEvent) + Send + Sync);

/// A chat completion backend.
///
/// Implementors must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Run one completion.
    ///
    /// Cancelling `cancel` ends the call with
    /// [`LlmError::Aborted`](crate::LlmError::Aborted) carrying the text
    /// received so far.
    async fn chat(
        &self,
        request: &ChatRequest,
        sink: EventSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion>;
}
