//! Estimated [`TokenUsage`] for the remote chat log.

use tenx_core::chat_log::TokenUsage;
use tenx_core::messages::{ChatMessage, Role};

use crate::estimator::{count_messages, estimate_token_length};

/// Usage of one model call: `prompt` was sent, `completion` came back.
pub fn usage_for_completion(prompt: &[ChatMessage], completion: &str) -> TokenUsage {
    TokenUsage::new(count_messages(prompt), estimate_token_length(completion))
}

/// Usage of a whole history. Assistant turns count as completion, everything
/// else as prompt. Failed turns are skipped.
pub fn usage_for_messages(messages: &[ChatMessage]) -> TokenUsage {
    let (completion, prompt): (Vec<&ChatMessage>, Vec<&ChatMessage>) = messages
        .iter()
        .filter(|m| !m.is_error)
        .partition(|m| m.role == Role::Assistant);
    TokenUsage::new(count_messages(prompt), count_messages(completion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_usage_splits_prompt_and_answer() {
        let prompt = vec![ChatMessage::system("abcd"), ChatMessage::user("abcdabcd")];
        let usage = usage_for_completion(&prompt, "abcdabcdabcd");
        assert_eq!(usage, TokenUsage::new(3, 3));
        assert_eq!(usage.total_tokens, 6);
    }

    #[test]
    fn history_usage_skips_errors() {
        let mut failed = ChatMessage::assistant("abcdabcdabcdabcd");
        failed.is_error = true;
        let msgs = vec![
            ChatMessage::user("abcd"),
            ChatMessage::assistant("abcdabcd"),
            failed,
        ];
        assert_eq!(usage_for_messages(&msgs), TokenUsage::new(1, 2));
    }
}
