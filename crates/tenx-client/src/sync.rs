//! Server sync adapter.
//!
//! Mirrors local sessions to the chat log API. Every entry point logs and
//! swallows failures; local state stays the source of truth.

use std::sync::Arc;

use tenx_core::{ChatId, ChatLogPayload, ChatSession, Mask};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::remote::ChatLogRemote;

/// Page size used when loading every remote session.
pub const LOAD_PAGE_SIZE: u32 = 50;

/// What a sync call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No remote record existed; one was created.
    Created,
    /// The remote record was patched.
    Patched,
    /// The call failed and was logged.
    Failed,
}

/// Best-effort mirror of local sessions.
#[derive(Clone)]
pub struct SyncAdapter {
    remote: Arc<dyn ChatLogRemote>,
}

impl SyncAdapter {
    /// Adapter over a remote.
    pub fn new(remote: Arc<dyn ChatLogRemote>) -> Self {
        Self { remote }
    }

    /// Create the remote record when absent, otherwise patch it with the
    /// session's messages, topic, model and usage.
    pub async fn sync(&self, session: &ChatSession) -> SyncOutcome {
        match self.try_sync(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "failed to sync chat log");
                SyncOutcome::Failed
            }
        }
    }

    async fn try_sync(&self, session: &ChatSession) -> Result<SyncOutcome> {
        let payload = ChatLogPayload::from_session(session);
        if self.remote.get(&session.id).await?.is_none() {
            let _ = self.remote.create(&payload).await?;
            debug!(session_id = %session.id, "created remote chat log");
            return Ok(SyncOutcome::Created);
        }
        let _ = self.remote.patch(&session.id, &payload.into_patch()).await?;
        debug!(session_id = %session.id, messages = session.messages.len(), "patched remote chat log");
        Ok(SyncOutcome::Patched)
    }

    /// Create the remote record for a new or restored session.
    pub async fn create(&self, session: &ChatSession) {
        if let Err(e) = self.remote.create(&ChatLogPayload::from_session(session)).await {
            warn!(session_id = %session.id, error = %e, "failed to create chat log");
        }
    }

    /// Delete the remote record of a session.
    pub async fn delete(&self, chat_id: &ChatId) {
        match self.remote.delete(chat_id).await {
            Ok(true) => debug!(session_id = %chat_id, "deleted remote chat log"),
            Ok(false) => debug!(session_id = %chat_id, "remote chat log already absent"),
            Err(e) => warn!(session_id = %chat_id, error = %e, "failed to delete chat log"),
        }
    }

    /// Every remote session, newest first, rebuilt around `mask`. Falls back
    /// to a single empty session when the remote is empty or unreachable.
    pub async fn load(&self, mask: &Mask) -> Vec<ChatSession> {
        match self.try_load(mask).await {
            Ok(sessions) if !sessions.is_empty() => {
                info!(count = sessions.len(), "loaded sessions from server");
                sessions
            }
            Ok(_) => {
                info!("no sessions on server, starting fresh");
                vec![ChatSession::with_mask(mask.clone())]
            }
            Err(e) => {
                warn!(error = %e, "failed to load sessions from server");
                vec![ChatSession::with_mask(mask.clone())]
            }
        }
    }

    async fn try_load(&self, mask: &Mask) -> Result<Vec<ChatSession>> {
        let mut sessions = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.remote.list(LOAD_PAGE_SIZE, offset).await?;
            let fetched = u32::try_from(page.chat_logs.len()).unwrap_or(u32::MAX);
            sessions.extend(
                page.chat_logs
                    .into_iter()
                    .map(|log| ChatSession::from_chat_log(log, mask.clone())),
            );
            offset = offset.saturating_add(fetched);
            if fetched == 0 || u64::from(offset) >= page.pagination.total {
                break;
            }
        }
        Ok(sessions)
    }
}
