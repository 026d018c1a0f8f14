//! # OpenAI-compatible client
//!
//! Talks to any endpoint implementing `POST /v1/chat/completions`, streaming
//! through SSE when the request asks for it.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tenx_core::messages::ChatMessageTool;
use tenx_settings::ProviderSettings;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatApi, EventSink};
use crate::errors::{LlmError, Result};
use crate::sse::{parse_sse_data, parse_sse_lines};
use crate::types::{ChatCompletion, ChatEvent, ChatRequest};

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolCallDelta {
    index: Option<u32>,
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseChoice {
    #[serde(default)]
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ToolCallState {
    id: String,
    kind: Option<String>,
    name: String,
    args: String,
}

/// Accumulated content of one streamed response.
#[derive(Debug, Default)]
struct StreamState {
    text: String,
    tools: BTreeMap<u32, ToolCallState>,
}

impl StreamState {
    /// Fold a chunk into the state. Returns the text added, if any.
    fn apply(&mut self, chunk: CompletionChunk) -> Option<String> {
        let mut added = String::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                added.push_str(&content);
            }
            for call in choice.delta.tool_calls {
                let idx = call.index.unwrap_or(0);
                let entry = self.tools.entry(idx).or_default();
                if let Some(id) = call.id {
                    entry.id = id;
                }
                if call.kind.is_some() {
                    entry.kind = call.kind;
                }
                if let Some(f) = call.function {
                    if let Some(name) = f.name {
                        entry.name.push_str(&name);
                    }
                    if let Some(args) = f.arguments {
                        entry.args.push_str(&args);
                    }
                }
            }
        }
        if added.is_empty() {
            return None;
        }
        self.text.push_str(&added);
        Some(added)
    }

    fn finish_tools(&mut self) -> Vec<ChatMessageTool> {
        std::mem::take(&mut self.tools)
            .into_iter()
            .map(|(index, t)| ChatMessageTool {
                id: t.id,
                index: Some(index),
                kind: t.kind.or_else(|| Some("function".to_string())),
                function: Some(serde_json::json!({"name": t.name, "arguments": t.args})),
                ..ChatMessageTool::default()
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Chat completion client for OpenAI-compatible endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    chat_path: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    /// Create a client.
    pub fn new(
        base_url: impl Into<String>,
        chat_path: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            chat_path: chat_path.into(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from provider settings.
    pub fn from_settings(settings: &ProviderSettings, timeout: Duration) -> Result<Self> {
        let path = if settings.chat_path.is_empty() {
            "/v1/chat/completions"
        } else {
            settings.chat_path.as_str()
        };
        Self::new(&settings.base_url, path, &settings.api_key, timeout)
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.chat_path)
    }

    async fn read_stream(
        response: reqwest::Response,
        status: u16,
        sink: EventSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let mut lines = Box::pin(parse_sse_lines(Box::pin(response.bytes_stream()), false));
        let mut state = StreamState::default();

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => {
                    debug!(received = state.text.len(), "stream aborted");
                    return Err(LlmError::Aborted { partial: state.text });
                }
                line = lines.next() => line,
            };
            let Some(data) = next else { break };
            let Some(chunk) = parse_sse_data::<CompletionChunk>(&data, "openai") else {
                continue;
            };
            if let Some(added) = state.apply(chunk) {
                sink(ChatEvent::Update {
                    message: state.text.clone(),
                    chunk: added,
                });
            }
        }

        let tools = state.finish_tools();
        for tool in &tools {
            sink(ChatEvent::Tool(tool.clone()));
        }
        Ok(ChatCompletion {
            content: state.text,
            status,
            tools,
        })
    }

    async fn read_body(
        response: reqwest::Response,
        status: u16,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let body: CompletionResponse = tokio::select! {
            () = cancel.cancelled() => return Err(LlmError::Aborted { partial: String::new() }),
            body = response.json() => body?,
        };
        let message = body.choices.into_iter().next().map(|c| c.message).unwrap_or_default();
        let tools = message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| ChatMessageTool {
                id: call["id"].as_str().unwrap_or_default().to_string(),
                index: u32::try_from(i).ok(),
                kind: call["type"].as_str().map(str::to_string),
                function: call.get("function").cloned(),
                ..ChatMessageTool::default()
            })
            .collect();
        Ok(ChatCompletion {
            content: message.content.unwrap_or_default(),
            status,
            tools,
        })
    }
}

/// Pull `error.message` out of a JSON error body, else return the body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ChatApi for OpenAiCompatibleClient {
    async fn chat(
        &self,
        request: &ChatRequest,
        sink: EventSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let mut builder = self.http.post(self.url()).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        debug!(model = %request.model, stream = request.stream, "sending chat request");

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(LlmError::Aborted { partial: String::new() }),
            response = builder.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(status = status.as_u16(), model = %request.model, %message, "chat request failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if request.stream {
            Self::read_stream(response, status.as_u16(), sink, cancel).await
        } else {
            Self::read_body(response, status.as_u16(), cancel).await
        }
    }
}
