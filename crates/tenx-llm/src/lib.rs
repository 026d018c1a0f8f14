//! # tenx-llm
//!
//! Chat completion client abstraction.
//!
//! - [`ChatApi`]: one model call with a streaming callback and cancellation
//! - [`OpenAiCompatibleClient`]: `/chat/completions` over HTTP with SSE
//! - [`ProviderRegistry`]: routes a request to the client of its provider
//! - [`sse`]: line-buffered SSE parser shared by streaming clients

#![deny(unsafe_code)]

pub mod api;
pub mod errors;
pub mod openai;
pub mod registry;
pub mod sse;
pub mod types;

pub use api::{ChatApi, EventSink};
pub use errors::{LlmError, Result};
pub use openai::OpenAiCompatibleClient;
pub use registry::ProviderRegistry;
pub use types::{ChatCompletion, ChatEvent, ChatRequest, RequestMessage};
