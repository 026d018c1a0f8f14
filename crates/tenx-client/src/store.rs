//! The session store.
//!
//! An explicit state container: every mutator clones the current
//! [`ChatState`], applies the change, restores the invariants, publishes the
//! result as a new immutable snapshot and writes it through the
//! [`StatePersister`]. Readers hold `Arc<ChatState>` snapshots and never see
//! a half-applied change.
//!
//! The store never talks to the network. Remote mirroring is the caller's
//! job (see [`crate::controller::ChatController`]).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tenx_core::{ChatId, ChatMessage, ChatSession, Mask};
use tracing::{debug, warn};

use crate::persist::StatePersister;
use crate::state::ChatState;

/// A session removed by [`ChatStore::delete_session`], restorable within the
/// undo window.
#[derive(Clone, Debug)]
pub struct DeletedSession {
    /// The removed session.
    pub session: ChatSession,
    /// Its position before removal.
    pub index: usize,
    previous_current: usize,
    placeholder: Option<ChatId>,
    deleted_at: Instant,
}

/// Local-first store of chat sessions.
pub struct ChatStore {
    state: RwLock<Arc<ChatState>>,
    persister: Arc<dyn StatePersister>,
    undo_window: Duration,
}

impl ChatStore {
    /// Store over the persisted state, or a fresh state when nothing was
    /// saved or the saved state is unreadable.
    pub fn open(persister: Arc<dyn StatePersister>, undo_window: Duration) -> Self {
        let state = match persister.load() {
            Ok(Some(state)) => state,
            Ok(None) => ChatState::default(),
            Err(e) => {
                warn!(error = %e, "failed to load chat state, starting fresh");
                ChatState::default()
            }
        };
        Self::with_state(state, persister, undo_window)
    }

    /// Store over an explicit initial state.
    pub fn with_state(
        mut state: ChatState,
        persister: Arc<dyn StatePersister>,
        undo_window: Duration,
    ) -> Self {
        state.normalize();
        Self {
            state: RwLock::new(Arc::new(state)),
            persister,
            undo_window,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ChatState> {
        Arc::clone(&self.state.read())
    }

    /// Copy of the selected session.
    pub fn current_session(&self) -> ChatSession {
        self.snapshot().current().clone()
    }

    /// Copy of a session by id.
    pub fn session(&self, id: &ChatId) -> Option<ChatSession> {
        let snap = self.snapshot();
        snap.position(id).map(|i| snap.sessions[i].clone())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut guard = self.state.write();
        let mut next = ChatState::clone(&guard);
        let out = f(&mut next);
        next.normalize();
        if let Err(e) = self.persister.save(&next) {
            warn!(error = %e, "failed to persist chat state");
        }
        *guard = Arc::new(next);
        out
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session list
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a new session at the top and select it.
    pub fn new_session(&self, mask: Option<Mask>) -> ChatSession {
        let session = mask.map_or_else(ChatSession::new, ChatSession::with_mask);
        self.mutate(|s| {
            s.sessions.insert(0, session.clone());
            s.current_session_index = 0;
        });
        debug!(session_id = %session.id, "created session");
        session
    }

    /// Duplicate the selected session's topic, history and mask as a new
    /// session at the top, and select it.
    pub fn fork_session(&self) -> ChatSession {
        self.mutate(|s| {
            let current = s.current().clone();
            let mut fork = ChatSession::with_mask(current.mask.clone());
            fork.topic = current.topic;
            fork.messages = current.messages;
            s.sessions.insert(0, fork.clone());
            s.current_session_index = 0;
            fork
        })
    }

    /// Drop every session, leaving one fresh session.
    pub fn clear_sessions(&self) {
        self.mutate(|s| {
            s.sessions = vec![ChatSession::new()];
            s.current_session_index = 0;
        });
    }

    /// Select a session. Out-of-range indices are clamped.
    pub fn select_session(&self, index: usize) {
        self.mutate(|s| s.current_session_index = index);
    }

    /// Move the selection by `delta`, wrapping around.
    pub fn next_session(&self, delta: isize) {
        self.mutate(|s| {
            let n = isize::try_from(s.sessions.len()).unwrap_or(isize::MAX);
            let i = isize::try_from(s.current_session_index).unwrap_or(0);
            let next = (i + delta).rem_euclid(n);
            s.current_session_index = usize::try_from(next).unwrap_or(0);
        });
    }

    /// Move the session at `from` to `to`, keeping the same session selected.
    pub fn move_session(&self, from: usize, to: usize) {
        self.mutate(|s| {
            let len = s.sessions.len();
            if from >= len || to >= len || from == to {
                return;
            }
            let session = s.sessions.remove(from);
            s.sessions.insert(to, session);

            let old = s.current_session_index;
            s.current_session_index = if old == from {
                to
            } else if old > from && old <= to {
                old - 1
            } else if old < from && old >= to {
                old + 1
            } else {
                old
            };
        });
    }

    /// Remove the session at `index`. Deleting the only session leaves a
    /// fresh one in its place.
    pub fn delete_session(&self, index: usize) -> Option<DeletedSession> {
        self.mutate(|s| {
            if index >= s.sessions.len() {
                return None;
            }
            let previous_current = s.current_session_index;
            let session = s.sessions.remove(index);

            let mut placeholder = None;
            if s.sessions.is_empty() {
                let fresh = ChatSession::new();
                placeholder = Some(fresh.id.clone());
                s.sessions.push(fresh);
                s.current_session_index = 0;
            } else {
                let shifted = previous_current - usize::from(index < previous_current);
                s.current_session_index = shifted.min(s.sessions.len() - 1);
            }

            debug!(session_id = %session.id, index, "deleted session");
            Some(DeletedSession {
                session,
                index,
                previous_current,
                placeholder,
                deleted_at: Instant::now(),
            })
        })
    }

    /// Put a deleted session back where it was. Returns `false` once the
    /// undo window has passed.
    pub fn restore_deleted(&self, deleted: DeletedSession) -> bool {
        if deleted.deleted_at.elapsed() > self.undo_window {
            debug!(session_id = %deleted.session.id, "undo window elapsed");
            return false;
        }
        self.mutate(|s| {
            if s.position(&deleted.session.id).is_some() {
                return;
            }
            if let Some(placeholder) = &deleted.placeholder {
                s.sessions
                    .retain(|x| &x.id != placeholder || !x.messages.is_empty());
            }
            let at = deleted.index.min(s.sessions.len());
            s.sessions.insert(at, deleted.session);
            s.current_session_index = deleted.previous_current;
        });
        true
    }

    /// Replace every session, selecting the first.
    pub fn replace_sessions(&self, sessions: Vec<ChatSession>) {
        self.mutate(|s| {
            s.sessions = sessions;
            s.current_session_index = 0;
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session contents
    // ─────────────────────────────────────────────────────────────────────

    /// Apply `updater` to the session with `id`. Returns the updated copy,
    /// or `None` when the session no longer exists.
    pub fn update_target_session(
        &self,
        id: &ChatId,
        updater: impl FnOnce(&mut ChatSession),
    ) -> Option<ChatSession> {
        self.mutate(|s| {
            let index = s.position(id)?;
            let session = &mut s.sessions[index];
            updater(session);
            session.clamp_indices();
            session.last_update = tenx_core::now_ms();
            Some(session.clone())
        })
    }

    /// Clear a session's history and memory.
    pub fn reset_session(&self, id: &ChatId) -> Option<ChatSession> {
        self.update_target_session(id, ChatSession::reset)
    }

    /// Apply `updater` to one message by position.
    pub fn update_message(
        &self,
        session_index: usize,
        message_index: usize,
        updater: impl FnOnce(&mut ChatMessage),
    ) -> Option<ChatMessage> {
        self.mutate(|s| {
            let message = s
                .sessions
                .get_mut(session_index)?
                .messages
                .get_mut(message_index)?;
            updater(message);
            Some(message.clone())
        })
    }

    /// Remember the input box draft.
    pub fn set_last_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.mutate(|s| s.last_input = text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryPersister;
    use proptest::prelude::*;

    fn store() -> ChatStore {
        ChatStore::with_state(
            ChatState::default(),
            Arc::new(MemoryPersister::default()),
            Duration::from_secs(5),
        )
    }

    fn store_with(n: usize) -> ChatStore {
        let sessions = (0..n)
            .map(|i| {
                let mut s = ChatSession::new();
                s.topic = format!("s{i}");
                s
            })
            .collect();
        ChatStore::with_state(
            ChatState::with_sessions(sessions),
            Arc::new(MemoryPersister::default()),
            Duration::from_secs(5),
        )
    }

    fn topics(store: &ChatStore) -> Vec<String> {
        store.snapshot().sessions.iter().map(|s| s.topic.clone()).collect()
    }

    #[test]
    fn deleting_only_session_leaves_one_empty() {
        let store = store();
        let deleted = store.delete_session(0).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.sessions.len(), 1);
        assert_eq!(snap.current_session_index, 0);
        assert!(snap.sessions[0].messages.is_empty());
        assert_ne!(snap.sessions[0].id, deleted.session.id);
    }

    #[test]
    fn delete_before_current_shifts_selection() {
        let store = store_with(3);
        store.select_session(2);
        let _ = store.delete_session(0).unwrap();
        assert_eq!(store.current_session().topic, "s2");
        assert_eq!(store.snapshot().current_session_index, 1);
    }

    #[test]
    fn delete_out_of_range_is_none() {
        assert!(store_with(2).delete_session(5).is_none());
    }

    #[test]
    fn restore_within_window() {
        let store = store_with(3);
        store.select_session(1);
        let deleted = store.delete_session(1).unwrap();
        assert_eq!(topics(&store), ["s0", "s2"]);

        assert!(store.restore_deleted(deleted));
        assert_eq!(topics(&store), ["s0", "s1", "s2"]);
        assert_eq!(store.current_session().topic, "s1");
    }

    #[test]
    fn restore_last_session_drops_untouched_placeholder() {
        let store = store_with(1);
        let deleted = store.delete_session(0).unwrap();
        assert!(store.restore_deleted(deleted));
        assert_eq!(topics(&store), ["s0"]);
    }

    #[test]
    fn restore_after_window_fails() {
        let store = ChatStore::with_state(
            ChatState::with_sessions(vec![ChatSession::new(), ChatSession::new()]),
            Arc::new(MemoryPersister::default()),
            Duration::ZERO,
        );
        let deleted = store.delete_session(0).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        assert!(!store.restore_deleted(deleted));
        assert_eq!(store.snapshot().sessions.len(), 1);
    }

    #[test]
    fn fork_copies_history_and_selects_copy() {
        let store = store();
        let id = store.current_session().id;
        let _ = store.update_target_session(&id, |s| {
            s.topic = "Original".into();
            s.messages.push(ChatMessage::user("a"));
            s.messages.push(ChatMessage::assistant("b"));
            s.messages.push(ChatMessage::user("c"));
        });

        let fork = store.fork_session();
        let snap = store.snapshot();
        assert_eq!(snap.sessions.len(), 2);
        assert_eq!(snap.current_session_index, 0);
        assert_eq!(snap.sessions[0].id, fork.id);
        assert_ne!(fork.id, id);
        assert_eq!(fork.topic, "Original");
        assert_eq!(fork.messages, snap.sessions[1].messages);
    }

    #[test]
    fn fork_is_independent() {
        let store = store();
        let original = store.current_session().id;
        let _ = store.update_target_session(&original, |s| s.messages.push(ChatMessage::user("a")));
        let fork = store.fork_session();
        let _ = store.update_target_session(&fork.id, |s| s.messages.clear());
        assert_eq!(store.session(&original).unwrap().messages.len(), 1);
    }

    #[test]
    fn move_keeps_selected_session() {
        let store = store_with(4);
        store.select_session(1);
        store.move_session(0, 2);
        assert_eq!(topics(&store), ["s1", "s2", "s0", "s3"]);
        assert_eq!(store.current_session().topic, "s1");

        store.move_session(3, 0);
        assert_eq!(topics(&store), ["s3", "s1", "s2", "s0"]);
        assert_eq!(store.current_session().topic, "s1");

        store.move_session(1, 3);
        assert_eq!(store.current_session().topic, "s1");
        assert_eq!(store.snapshot().current_session_index, 3);
    }

    #[test]
    fn next_session_wraps() {
        let store = store_with(3);
        store.next_session(-1);
        assert_eq!(store.snapshot().current_session_index, 2);
        store.next_session(2);
        assert_eq!(store.snapshot().current_session_index, 1);
    }

    #[test]
    fn new_session_with_mask_uses_mask_name() {
        let store = store();
        let mask = Mask {
            name: "Translator".into(),
            ..Mask::default()
        };
        let session = store.new_session(Some(mask));
        assert_eq!(session.topic, "Translator");
        assert_eq!(store.current_session().id, session.id);
    }

    #[test]
    fn reset_clears_history_and_memory() {
        let store = store();
        let id = store.current_session().id;
        let _ = store.update_target_session(&id, |s| {
            s.messages.push(ChatMessage::user("a"));
            s.memory_prompt = "memo".into();
            s.last_summarize_index = 1;
        });
        let reset = store.reset_session(&id).unwrap();
        assert!(reset.messages.is_empty());
        assert!(reset.memory_prompt.is_empty());
        assert_eq!(reset.last_summarize_index, 0);
    }

    #[test]
    fn update_missing_session_is_none() {
        assert!(store().update_target_session(&ChatId::new(), |_| {}).is_none());
    }

    #[test]
    fn update_message_by_position() {
        let store = store();
        let id = store.current_session().id;
        let _ = store.update_target_session(&id, |s| s.messages.push(ChatMessage::user("a")));
        let m = store.update_message(0, 0, |m| m.is_error = true).unwrap();
        assert!(m.is_error);
        assert!(store.update_message(0, 3, |_| {}).is_none());
    }

    #[test]
    fn every_mutation_is_persisted() {
        let persister = Arc::new(MemoryPersister::default());
        let store = ChatStore::with_state(
            ChatState::default(),
            persister.clone(),
            Duration::from_secs(5),
        );
        store.set_last_input("draft");
        let _ = store.new_session(None);
        assert_eq!(persister.save_count(), 2);
        assert_eq!(persister.load().unwrap().unwrap().last_input, "draft");
    }

    #[test]
    fn open_reads_persisted_state() {
        let persister = Arc::new(MemoryPersister::default());
        let mut state = ChatState::with_sessions(vec![ChatSession::new(), ChatSession::new()]);
        state.current_session_index = 1;
        persister.save(&state).unwrap();

        let store = ChatStore::open(persister, Duration::from_secs(5));
        assert_eq!(*store.snapshot(), state);
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = store();
        let before = store.snapshot();
        let _ = store.new_session(None);
        assert_eq!(before.sessions.len(), 1);
        assert_eq!(store.snapshot().sessions.len(), 2);
    }

    #[derive(Clone, Debug)]
    enum Op {
        New,
        Fork,
        Delete(usize),
        Select(usize),
        Move(usize, usize),
        Next(isize),
        Push(usize),
        Summarize(usize),
        Reset,
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::New),
            Just(Op::Fork),
            (0usize..6).prop_map(Op::Delete),
            (0usize..6).prop_map(Op::Select),
            (0usize..6, 0usize..6).prop_map(|(a, b)| Op::Move(a, b)),
            (-3isize..3).prop_map(Op::Next),
            (1usize..4).prop_map(Op::Push),
            (0usize..10).prop_map(Op::Summarize),
            Just(Op::Reset),
            Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op(), 0..40)) {
            let store = store();
            for op in ops {
                let current = store.current_session().id;
                match op {
                    Op::New => { let _ = store.new_session(None); }
                    Op::Fork => { let _ = store.fork_session(); }
                    Op::Delete(i) => { let _ = store.delete_session(i); }
                    Op::Select(i) => store.select_session(i),
                    Op::Move(a, b) => store.move_session(a, b),
                    Op::Next(d) => store.next_session(d),
                    Op::Push(n) => {
                        let _ = store.update_target_session(&current, |s| {
                            for _ in 0..n {
                                s.messages.push(ChatMessage::user("x"));
                            }
                        });
                    }
                    Op::Summarize(i) => {
                        let _ = store.update_target_session(&current, |s| s.last_summarize_index = i);
                    }
                    Op::Reset => { let _ = store.reset_session(&current); }
                    Op::Clear => store.clear_sessions(),
                }

                let snap = store.snapshot();
                prop_assert!(!snap.sessions.is_empty());
                prop_assert!(snap.current_session_index < snap.sessions.len());
                for s in &snap.sessions {
                    prop_assert!(s.last_summarize_index <= s.messages.len());
                }
            }
        }
    }
}
