//! In-flight request registry.

use std::collections::HashMap;

use parking_lot::Mutex;
use tenx_core::{ChatId, MessageId};
use tokio_util::sync::CancellationToken;

/// Cancellation handles of streaming calls, keyed by session and bot message.
#[derive(Debug, Default)]
pub struct ControllerPool {
    controllers: Mutex<HashMap<(ChatId, MessageId), CancellationToken>>,
}

impl ControllerPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call and return its token.
    pub fn add(&self, session_id: &ChatId, message_id: &MessageId) -> CancellationToken {
        let token = CancellationToken::new();
        let _ = self
            .controllers
            .lock()
            .insert((session_id.clone(), message_id.clone()), token.clone());
        token
    }

    /// Cancel one call. Returns whether it was registered.
    pub fn stop(&self, session_id: &ChatId, message_id: &MessageId) -> bool {
        let token = self
            .controllers
            .lock()
            .remove(&(session_id.clone(), message_id.clone()));
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every call.
    pub fn stop_all(&self) {
        for (_, token) in self.controllers.lock().drain() {
            token.cancel();
        }
    }

    /// Forget a finished call.
    pub fn remove(&self, session_id: &ChatId, message_id: &MessageId) {
        let _ = self
            .controllers
            .lock()
            .remove(&(session_id.clone(), message_id.clone()));
    }

    /// Whether any call is in flight.
    pub fn has_pending(&self) -> bool {
        !self.controllers.lock().is_empty()
    }

    /// Whether a call is in flight for `session_id`.
    pub fn has_pending_for(&self, session_id: &ChatId) -> bool {
        self.controllers.lock().keys().any(|(s, _)| s == session_id)
    }
}
