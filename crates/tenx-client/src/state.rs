//! The persisted chat state.

use serde::{Deserialize, Serialize};
use tenx_core::ChatSession;

/// Everything the session store owns. Always holds at least one session and
/// a `current_session_index` inside `sessions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    /// Sessions, most recent first.
    pub sessions: Vec<ChatSession>,
    /// Index of the selected session.
    pub current_session_index: usize,
    /// Draft text of the input box.
    #[serde(default)]
    pub last_input: String,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::with_sessions(Vec::new())
    }
}

impl ChatState {
    /// State over `sessions`, selecting the first. An empty list gets one
    /// fresh session.
    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        let mut state = Self {
            sessions,
            current_session_index: 0,
            last_input: String::new(),
        };
        state.normalize();
        state
    }

    /// Restore the invariants: at least one session, the index in range and
    /// every session's indices within its history.
    pub fn normalize(&mut self) {
        if self.sessions.is_empty() {
            self.sessions.push(ChatSession::new());
        }
        self.current_session_index = self.current_session_index.min(self.sessions.len() - 1);
        for session in &mut self.sessions {
            session.clamp_indices();
        }
    }

    /// The selected session.
    pub fn current(&self) -> &ChatSession {
        &self.sessions[self.current_session_index.min(self.sessions.len().saturating_sub(1))]
    }

    /// Position of a session by id.
    pub fn position(&self, id: &tenx_core::ChatId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }
}
