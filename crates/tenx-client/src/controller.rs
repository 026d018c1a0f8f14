//! Chat flow orchestration.
//!
//! [`ChatController`] ties the session store to the model API: it turns user
//! input into a streaming model call, writes every update back into the
//! store, and hands follow-up work (summarization, remote sync) to the
//! background queue.

use std::sync::Arc;

use tenx_context::{
    PromptContext, assemble_context, fill_template_with, is_image_model, plan_compression,
    plan_title, select_summarize_model,
};
use tenx_core::constants::DEFAULT_LANG;
use tenx_core::{
    ChatId, ChatMessage, ChatMessageTool, ChatSession, Mask, MessageContent, MessageId,
    ModelConfig,
};
use tenx_llm::{ChatApi, ChatEvent, ChatRequest, LlmError};
use tenx_settings::ChatSettings;
use tenx_tokens::StatRecorder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller_pool::ControllerPool;
use crate::queue::BackgroundQueue;
use crate::store::{ChatStore, DeletedSession};
use crate::sync::SyncAdapter;

/// Behaviour switches of the chat flow.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatOptions {
    /// Generate a title once a session has enough content.
    pub auto_title: bool,
    /// Models the user can reach. Drives summarize-model selection.
    pub available_models: Vec<String>,
    /// Global model configuration used for new and loaded sessions.
    pub model_config: ModelConfig,
}

impl ChatOptions {
    /// Options from the chat settings section.
    pub fn from_settings(settings: &ChatSettings) -> Self {
        Self {
            auto_title: settings.enable_auto_generate_title,
            available_models: settings.available_models.clone(),
            model_config: settings.model_config.clone(),
        }
    }

    fn default_mask(&self) -> Mask {
        Mask::with_config(self.model_config.clone())
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from_settings(&ChatSettings::default())
    }
}

/// Drives chat turns against the store.
pub struct ChatController {
    store: Arc<ChatStore>,
    api: Arc<dyn ChatApi>,
    sync: Option<SyncAdapter>,
    queue: BackgroundQueue,
    pool: Arc<ControllerPool>,
    options: ChatOptions,
}

impl ChatController {
    /// Controller over `store`. Without a sync adapter nothing is mirrored.
    /// Must be called inside a tokio runtime.
    pub fn new(
        store: Arc<ChatStore>,
        api: Arc<dyn ChatApi>,
        sync: Option<SyncAdapter>,
        options: ChatOptions,
    ) -> Self {
        Self {
            store,
            api,
            sync,
            queue: BackgroundQueue::new(),
            pool: Arc::new(ControllerPool::new()),
            options,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    /// In-flight calls.
    pub fn pool(&self) -> &Arc<ControllerPool> {
        &self.pool
    }

    // ─────────────────────────────────────────────────────────────────────
    // Chat turn
    // ─────────────────────────────────────────────────────────────────────

    /// Send `content` (plus optional image URLs) in the current session and
    /// stream the answer into it. Returns the final bot message.
    ///
    /// An aborted call keeps the partial answer. A failed call appends the
    /// error to the bot message and flags both messages of the turn.
    pub async fn on_user_input(&self, content: &str, images: &[String]) -> ChatMessage {
        let session = self.store.current_session();
        let session_id = session.id.clone();
        let config = session.model_config().clone();
        let ctx = prompt_context(&session);

        let filled = fill_template_with(content, &config, &ctx);
        let user = ChatMessage::user(MessageContent::with_images(filled, images));
        let mut bot = ChatMessage::assistant("");
        bot.streaming = true;
        bot.model = Some(config.model.clone());

        let mut send = assemble_context(&session, &ctx).into_messages();
        send.push(user.clone());

        let pushed = self.store.update_target_session(&session_id, |s| {
            s.messages.push(user.clone());
            s.messages.push(bot.clone());
        });
        if pushed.is_none() {
            warn!(session_id = %session_id, "session vanished before send");
            return bot;
        }
        self.queue_sync(&session_id);

        let cancel = self.pool.add(&session_id, &bot.id);
        let request = ChatRequest::from_config(&send, &config, true);
        debug!(
            session_id = %session_id,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let store = Arc::clone(&self.store);
        let (sid, bid) = (session_id.clone(), bot.id.clone());
        let sink = move |event: ChatEvent| match event {
            ChatEvent::Update { message, .. } => {
                let _ = store.update_target_session(&sid, |s| {
                    if let Some(m) = find_message(s, &bid) {
                        m.content = MessageContent::Text(message);
                    }
                });
            }
            ChatEvent::Tool(tool) => {
                let _ = store.update_target_session(&sid, |s| {
                    if let Some(m) = find_message(s, &bid) {
                        upsert_tool(&mut m.tools, tool);
                    }
                });
            }
        };

        let result = self.api.chat(&request, &sink, &cancel).await;
        self.pool.remove(&session_id, &bot.id);

        let user_id = user.id.clone();
        let completed = result.is_ok();
        let finished = match result {
            Ok(completion) => {
                info!(session_id = %session_id, status = completion.status, "chat finished");
                self.store.update_target_session(&session_id, |s| {
                    let Some(m) = find_message(s, &bot.id) else {
                        return;
                    };
                    m.streaming = false;
                    m.content = MessageContent::Text(completion.content.clone());
                    if !completion.tools.is_empty() {
                        m.tools.clone_from(&completion.tools);
                    }
                    m.date = chrono::Utc::now().to_rfc3339();
                    let done = m.clone();
                    s.stat.record(&done);
                })
            }
            Err(LlmError::Aborted { partial }) => {
                info!(session_id = %session_id, "chat aborted");
                self.store.update_target_session(&session_id, |s| {
                    if let Some(m) = find_message(s, &bot.id) {
                        m.streaming = false;
                        if !partial.is_empty() {
                            m.content = MessageContent::Text(partial);
                        }
                    }
                })
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, category = e.category(), "chat failed");
                let block = error_block(&e);
                self.store.update_target_session(&session_id, |s| {
                    if let Some(m) = find_message(s, &bot.id) {
                        m.streaming = false;
                        m.is_error = true;
                        m.content = MessageContent::Text(format!("{}{block}", m.text_content()));
                    }
                    if let Some(m) = find_message(s, &user_id) {
                        m.is_error = true;
                    }
                })
            }
        };

        let final_bot = finished
            .as_ref()
            .and_then(|s| s.messages.iter().find(|m| m.id == bot.id).cloned())
            .unwrap_or(bot);
        if finished.is_some() {
            // aborted and failed turns are mirrored but never summarized
            if completed && !final_bot.is_error {
                self.summarize_session(false, &session_id);
            }
            self.queue_sync(&session_id);
        }
        final_bot
    }

    /// Abort the call streaming into `message_id`.
    pub fn stop(&self, session_id: &ChatId, message_id: &MessageId) -> bool {
        self.pool.stop(session_id, message_id)
    }

    /// Abort every in-flight call.
    pub fn stop_all(&self) {
        self.pool.stop_all();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Summarization
    // ─────────────────────────────────────────────────────────────────────

    /// Queue title generation and memory compression for a session, when
    /// due. Image-generation sessions are never summarized.
    pub fn summarize_session(&self, refresh_title: bool, session_id: &ChatId) {
        let Some(session) = self.store.session(session_id) else {
            return;
        };
        let config = session.model_config().clone();
        if is_image_model(&config.model) {
            debug!(session_id = %session_id, model = %config.model, "skipping summarize for image model");
            return;
        }
        let model = select_summarize_model(&config, &self.options.available_models);

        if let Some(plan) = plan_title(&session, self.options.auto_title, refresh_title, &model) {
            let request = plan.request(&config);
            let api = Arc::clone(&self.api);
            let store = Arc::clone(&self.store);
            let sync = self.sync.clone();
            let id = session_id.clone();
            let _ = self.queue.submit("title", async move {
                let completion = api.chat(&request, &|_: ChatEvent| {}, &CancellationToken::new()).await?;
                let Some(topic) = plan.topic_from(&completion) else {
                    debug!(session_id = %id, status = completion.status, "title call unsuccessful");
                    return Ok(());
                };
                info!(session_id = %id, topic = %topic, "session titled");
                let updated = store.update_target_session(&id, |s| s.topic = topic);
                if let (Some(sync), Some(session)) = (sync, updated) {
                    let _ = sync.sync(&session).await;
                }
                Ok(())
            });
        }

        if let Some(plan) = plan_compression(&session, &model) {
            let request = plan.request(&config);
            let api = Arc::clone(&self.api);
            let store = Arc::clone(&self.store);
            let id = session_id.clone();
            let _ = self.queue.submit("compress", async move {
                let progress_store = Arc::clone(&store);
                let progress_id = id.clone();
                let sink = move |event: ChatEvent| {
                    if let ChatEvent::Update { message, .. } = event {
                        let _ = progress_store
                            .update_target_session(&progress_id, |s| s.memory_prompt = message);
                    }
                };
                let completion = api.chat(&request, &sink, &CancellationToken::new()).await?;
                if completion.is_ok() {
                    let _ = store.update_target_session(&id, |s| plan.commit(s, &completion.content));
                    info!(
                        session_id = %id,
                        summarize_until = plan.summarize_until,
                        window_tokens = plan.window_tokens,
                        "memory compressed"
                    );
                }
                Ok(())
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session management with remote mirroring
    // ─────────────────────────────────────────────────────────────────────

    /// Replace local sessions with the remote set. Without a principal the
    /// store falls back to one empty session.
    pub async fn load_from_server(&self) {
        let mask = self.options.default_mask();
        let sessions = match &self.sync {
            Some(sync) => sync.load(&mask).await,
            None => {
                info!("no principal configured, starting with an empty session");
                vec![ChatSession::with_mask(mask)]
            }
        };
        self.store.replace_sessions(sessions);
    }

    /// Start a session and mirror it remotely.
    pub fn new_session(&self, mask: Option<Mask>) -> ChatSession {
        let mask = mask.unwrap_or_else(|| self.options.default_mask());
        let session = self.store.new_session(Some(mask));
        self.queue_create(&session);
        session
    }

    /// Duplicate the current session and mirror the copy remotely.
    pub fn fork_session(&self) -> ChatSession {
        let session = self.store.fork_session();
        self.queue_create(&session);
        session
    }

    /// Delete a session locally and remotely. Keep the returned value to
    /// undo within the undo window.
    pub fn delete_session(&self, index: usize) -> Option<DeletedSession> {
        let deleted = self.store.delete_session(index)?;
        if let Some(sync) = self.sync.clone() {
            let id = deleted.session.id.clone();
            let _ = self.queue.submit("delete", async move {
                sync.delete(&id).await;
                Ok(())
            });
        }
        Some(deleted)
    }

    /// Undo a delete and recreate the remote record.
    pub fn undo_delete(&self, deleted: DeletedSession) -> bool {
        let session = deleted.session.clone();
        let restored = self.store.restore_deleted(deleted);
        if restored {
            self.queue_create(&session);
        }
        restored
    }

    /// Clear a session's history and memory, then mirror it.
    pub fn reset_session(&self, session_id: &ChatId) -> Option<ChatSession> {
        let session = self.store.reset_session(session_id)?;
        self.queue_sync(session_id);
        Some(session)
    }

    /// Wait for queued background work.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    /// Abort in-flight calls and drain the background queue.
    pub async fn shutdown(self) {
        self.pool.stop_all();
        self.queue.shutdown().await;
    }

    fn queue_sync(&self, session_id: &ChatId) {
        let Some(sync) = self.sync.clone() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let id = session_id.clone();
        let _ = self.queue.submit("sync", async move {
            // latest state at run time, not at submission
            if let Some(session) = store.session(&id) {
                let _ = sync.sync(&session).await;
            }
            Ok(())
        });
    }

    fn queue_create(&self, session: &ChatSession) {
        let Some(sync) = self.sync.clone() else {
            return;
        };
        let session = session.clone();
        let _ = self.queue.submit("create", async move {
            sync.create(&session).await;
            Ok(())
        });
    }
}

fn prompt_context(session: &ChatSession) -> PromptContext {
    let lang = if session.mask.lang.is_empty() {
        DEFAULT_LANG
    } else {
        session.mask.lang.as_str()
    };
    PromptContext::now(lang)
}

fn find_message<'a>(session: &'a mut ChatSession, id: &MessageId) -> Option<&'a mut ChatMessage> {
    session.messages.iter_mut().find(|m| &m.id == id)
}

fn upsert_tool(tools: &mut Vec<ChatMessageTool>, tool: ChatMessageTool) {
    match tools.iter_mut().find(|t| t.id == tool.id) {
        Some(existing) => *existing = tool,
        None => tools.push(tool),
    }
}

/// Fenced JSON block appended to a failed answer.
fn error_block(error: &LlmError) -> String {
    let body = serde_json::json!({ "error": true, "message": error.to_string() });
    let pretty = serde_json::to_string_pretty(&body).unwrap_or_default();
    format!("\n\n```json\n{pretty}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryPersister;
    use crate::remote::MockChatLogRemote;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tenx_core::{ChatLog, Role};
    use tenx_llm::{ChatCompletion, EventSink};

    /// Scripted model: streams `chunks`, then answers with their
    /// concatenation, or fails/aborts as configured.
    #[derive(Default)]
    struct FakeApi {
        chunks: Vec<&'static str>,
        fail: bool,
        wait_for_cancel: bool,
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatApi for FakeApi {
        async fn chat(
            &self,
            request: &ChatRequest,
            sink: EventSink<'_>,
            cancel: &CancellationToken,
        ) -> tenx_llm::Result<ChatCompletion> {
            self.requests.lock().push(request.clone());
            let mut text = String::new();
            for chunk in &self.chunks {
                text.push_str(chunk);
                sink(ChatEvent::Update {
                    message: text.clone(),
                    chunk: (*chunk).to_string(),
                });
            }
            if self.wait_for_cancel {
                cancel.cancelled().await;
                return Err(LlmError::Aborted { partial: text });
            }
            if self.fail {
                return Err(LlmError::Api {
                    status: 500,
                    message: "upstream down".into(),
                });
            }
            Ok(ChatCompletion {
                content: text,
                status: 200,
                tools: Vec::new(),
            })
        }
    }

    fn store() -> Arc<ChatStore> {
        Arc::new(ChatStore::open(
            Arc::new(MemoryPersister::default()),
            Duration::from_secs(5),
        ))
    }

    fn options() -> ChatOptions {
        ChatOptions {
            auto_title: false,
            ..ChatOptions::default()
        }
    }

    #[tokio::test]
    async fn user_input_streams_answer_into_session() {
        let api = Arc::new(FakeApi {
            chunks: vec!["Hel", "lo"],
            ..FakeApi::default()
        });
        let controller = ChatController::new(store(), api.clone(), None, options());

        let bot = controller.on_user_input("hi", &[]).await;
        assert_eq!(bot.text_content(), "Hello");
        assert!(!bot.streaming);

        let session = controller.store().current_session();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].text_content(), "hi");
        assert_eq!(session.messages[1].text_content(), "Hello");
        assert!(session.stat.char_count >= 5);

        let sent = api.requests.lock();
        assert!(sent[0].stream);
        assert_eq!(sent[0].messages.last().map(|m| m.content.text()), Some("hi".into()));
        assert!(!controller.pool().has_pending());
    }

    #[tokio::test]
    async fn failure_flags_both_messages_and_appends_error() {
        let api = Arc::new(FakeApi {
            chunks: vec!["part"],
            fail: true,
            ..FakeApi::default()
        });
        let controller = ChatController::new(store(), api, None, options());

        let bot = controller.on_user_input("hi", &[]).await;
        assert!(bot.is_error);
        let text = bot.text_content();
        assert!(text.starts_with("part\n\n```json\n"));
        assert!(text.contains("\"error\": true"));

        let session = controller.store().current_session();
        assert!(session.messages.iter().all(|m| m.is_error));
    }

    #[tokio::test]
    async fn stop_keeps_partial_text_without_error() {
        let api = Arc::new(FakeApi {
            chunks: vec!["half"],
            wait_for_cancel: true,
            ..FakeApi::default()
        });
        let controller = Arc::new(ChatController::new(store(), api, None, options()));

        let c = Arc::clone(&controller);
        let turn = tokio::spawn(async move { c.on_user_input("hi", &[]).await });
        while !controller.pool().has_pending() {
            tokio::task::yield_now().await;
        }
        controller.stop_all();

        let bot = turn.await.unwrap();
        assert_eq!(bot.text_content(), "half");
        assert!(!bot.is_error);
        assert!(!bot.streaming);
    }

    #[tokio::test]
    async fn stopped_turn_is_not_summarized() {
        let api = Arc::new(FakeApi {
            chunks: vec!["half"],
            wait_for_cancel: true,
            ..FakeApi::default()
        });
        let mut config = ModelConfig::default();
        config.compress_message_length_threshold = 10;
        let opts = ChatOptions {
            auto_title: true,
            available_models: Vec::new(),
            model_config: config.clone(),
        };
        let store = store();
        let _ = store.new_session(Some(Mask::with_config(config)));
        let controller = Arc::new(ChatController::new(store, api.clone(), None, opts));

        let c = Arc::clone(&controller);
        let long = "long question ".repeat(20);
        let turn = tokio::spawn(async move { c.on_user_input(&long, &[]).await });
        while !controller.pool().has_pending() {
            tokio::task::yield_now().await;
        }
        controller.stop_all();
        let _ = turn.await.unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), controller.flush()).await;

        assert_eq!(api.requests.lock().len(), 1);
        let session = controller.store().current_session();
        assert!(session.memory_prompt.is_empty());
        assert_eq!(session.last_summarize_index, 0);
        assert_eq!(session.topic, tenx_core::constants::DEFAULT_TOPIC);
    }

    #[tokio::test]
    async fn title_is_generated_once_content_is_long_enough() {
        let api = Arc::new(FakeApi {
            chunks: vec!["\"Rust Questions.\""],
            ..FakeApi::default()
        });
        let opts = ChatOptions {
            auto_title: true,
            ..ChatOptions::default()
        };
        let controller = ChatController::new(store(), api.clone(), None, opts);

        let long = "word ".repeat(60);
        let _ = controller.on_user_input(&long, &[]).await;
        controller.flush().await;

        assert_eq!(controller.store().current_session().topic, "Rust Questions");
        let sent = api.requests.lock();
        assert_eq!(sent.len(), 2);
        assert!(!sent[1].stream);
    }

    #[tokio::test]
    async fn compression_commits_memory_and_index() {
        let api = Arc::new(FakeApi {
            chunks: vec!["summary"],
            ..FakeApi::default()
        });
        let mut config = ModelConfig::default();
        config.compress_message_length_threshold = 10;
        let opts = ChatOptions {
            auto_title: false,
            available_models: Vec::new(),
            model_config: config.clone(),
        };
        let store = store();
        let _ = store.new_session(Some(Mask::with_config(config)));
        let controller = ChatController::new(store, api, None, opts);

        let _ = controller.on_user_input(&"long question ".repeat(20), &[]).await;
        controller.flush().await;

        let session = controller.store().current_session();
        assert_eq!(session.memory_prompt, "summary");
        assert_eq!(session.last_summarize_index, 2);
    }

    #[tokio::test]
    async fn image_model_sessions_are_not_summarized() {
        let api = Arc::new(FakeApi::default());
        let mut config = ModelConfig::default();
        config.model = "dall-e-3".into();
        config.compress_message_length_threshold = 0;
        let store = store();
        let session = store.new_session(Some(Mask::with_config(config)));
        let _ = store.update_target_session(&session.id, |s| {
            s.messages.push(ChatMessage::user("draw a cat ".repeat(50)));
        });
        let controller = ChatController::new(store, api.clone(), None, options());

        controller.summarize_session(true, &session.id);
        controller.flush().await;
        assert!(api.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn delete_and_undo_are_mirrored() {
        let mut remote = MockChatLogRemote::new();
        let _ = remote.expect_delete().times(1).returning(|_| Ok(true));
        let _ = remote.expect_create().times(1).returning(|p| {
            Ok(ChatLog {
                chat_id: p.chat_id.clone().unwrap_or_default(),
                user_id: "u1".into(),
                model_id: String::new(),
                topic: String::new(),
                messages: Vec::new(),
                token_usage: tenx_core::TokenUsage::default(),
                cost: 0.0,
                created_at: String::new(),
                updated_at: None,
            })
        });
        let sync = SyncAdapter::new(Arc::new(remote));
        let controller =
            ChatController::new(store(), Arc::new(FakeApi::default()), Some(sync), options());

        let deleted = controller.delete_session(0).unwrap();
        controller.flush().await;
        assert!(controller.undo_delete(deleted));
        controller.flush().await;
        assert_eq!(controller.store().snapshot().sessions.len(), 1);
    }

    #[tokio::test]
    async fn load_without_principal_yields_one_empty_session() {
        let store = store();
        let _ = store.new_session(None);
        let controller = ChatController::new(store, Arc::new(FakeApi::default()), None, options());

        controller.load_from_server().await;
        let snap = controller.store().snapshot();
        assert_eq!(snap.sessions.len(), 1);
        assert!(snap.sessions[0].messages.is_empty());
    }

    #[test]
    fn tools_are_replaced_by_id() {
        let mut tools = Vec::new();
        let tool = |id: &str, content: &str| ChatMessageTool {
            id: id.into(),
            content: Some(content.into()),
            ..ChatMessageTool::default()
        };
        upsert_tool(&mut tools, tool("a", "1"));
        upsert_tool(&mut tools, tool("a", "2"));
        upsert_tool(&mut tools, tool("b", "3"));
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].content.as_deref(), Some("2"));
    }
}
