//! Provider registry: maps a provider name to its client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tenx_settings::LlmSettings;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::{ChatApi, EventSink};
use crate::errors::{LlmError, Result};
use crate::openai::OpenAiCompatibleClient;
use crate::types::{ChatCompletion, ChatRequest};

/// Routes requests to the client registered for `request.provider`.
///
/// Provider names are matched case-insensitively, so `OpenAI` and `openai`
/// reach the same client.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn ChatApi>>,
}

impl ProviderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an OpenAI-compatible client per configured provider.
    /// Providers whose client cannot be built are skipped with a warning.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let timeout = Duration::from_millis(settings.request_timeout_ms);
        let mut registry = Self::new();
        for (name, provider) in &settings.providers {
            match OpenAiCompatibleClient::from_settings(provider, timeout) {
                Ok(client) => registry.register(name, Arc::new(client)),
                Err(e) => warn!(provider = %name, error = %e, "skipping provider"),
            }
        }
        registry
    }

    /// Register (or replace) the client of a provider.
    pub fn register(&mut self, provider: &str, client: Arc<dyn ChatApi>) {
        let _ = self.clients.insert(provider.to_lowercase(), client);
    }

    /// Client of a provider.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn ChatApi>> {
        self.clients
            .get(&provider.to_lowercase())
            .cloned()
            .ok_or_else(|| LlmError::UnknownProvider(provider.to_string()))
    }

    /// Registered provider names.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ChatApi for ProviderRegistry {
    async fn chat(
        &self,
        request: &ChatRequest,
        sink: EventSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        self.get(&request.provider)?.chat(request, sink, cancel).await
    }
}
