//! Per-session counters.

use tenx_core::messages::ChatMessage;
use tenx_core::session::ChatStat;
use tenx_core::text::word_count;

use crate::estimator::estimate_message_tokens;

/// Accumulates message statistics into a [`ChatStat`].
pub trait StatRecorder {
    /// Add the characters, words and estimated tokens of `message`.
    fn record(&mut self, message: &ChatMessage);

    /// Add only the character count of `message`.
    fn record_chars(&mut self, message: &ChatMessage);
}

impl StatRecorder for ChatStat {
    fn record(&mut self, message: &ChatMessage) {
        let text = message.text_content();
        self.char_count += text.chars().count() as u64;
        self.word_count += word_count(&text) as u64;
        self.token_count += estimate_message_tokens(message);
    }

    fn record_chars(&mut self, message: &ChatMessage) {
        self.char_count += message.text_content().chars().count() as u64;
    }
}
