//! Context assembly: the ordered message list sent with a model call.
//!
//! Output order:
//!
//! 1. injected system prompt (GPT-family models only)
//! 2. long-term memory (the session's memory prompt)
//! 3. the mask's static context prompts
//! 4. recent history, chronological, within the `max_tokens` budget
//!
//! Only step 4 is counted against the budget.

use tenx_core::messages::ChatMessage;
use tenx_core::session::{ChatSession, ModelConfig};
use tenx_tokens::estimate_message_tokens;
use tracing::trace;

use crate::constants::{DEFAULT_SYSTEM_TEMPLATE, MEMORY_PROMPT_PREFIX, SYSTEM_PROMPT_MODEL_PREFIXES};
use crate::template::{PromptContext, fill_template_with};

/// The assembled context, split by origin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledContext {
    /// Injected system prompt, if any.
    pub system_prompts: Vec<ChatMessage>,
    /// Long-term memory message, if sent.
    pub memory: Option<ChatMessage>,
    /// Static prompts of the mask.
    pub context_prompts: Vec<ChatMessage>,
    /// Recent history in chronological order.
    pub recent: Vec<ChatMessage>,
    /// Estimated tokens of `recent`.
    pub recent_tokens: u64,
    /// First history index considered.
    pub context_start: usize,
}

impl AssembledContext {
    /// Flatten into the outbound message list.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        let mut out = self.system_prompts;
        out.extend(self.memory);
        out.extend(self.context_prompts);
        out.extend(self.recent);
        out
    }
}

/// Whether `model` gets the injected system prompt.
pub fn needs_system_prompt(model: &str) -> bool {
    SYSTEM_PROMPT_MODEL_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

/// The long-term memory message of a session, if it has a memory prompt.
pub fn memory_prompt_message(session: &ChatSession) -> Option<ChatMessage> {
    if session.memory_prompt.is_empty() {
        return None;
    }
    let mut msg = ChatMessage::system(format!("{MEMORY_PROMPT_PREFIX}{}", session.memory_prompt));
    msg.date = String::new();
    Some(msg)
}

/// Whether the memory prompt should accompany the next call.
pub fn should_send_long_term_memory(session: &ChatSession) -> bool {
    let clear = session.clear_context_index.unwrap_or(0);
    session.model_config().send_memory
        && !session.memory_prompt.is_empty()
        && session.last_summarize_index > clear
}

fn system_prompt(config: &ModelConfig, ctx: &PromptContext) -> ChatMessage {
    let system_config = ModelConfig {
        template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
        ..config.clone()
    };
    ChatMessage::system(fill_template_with("", &system_config, ctx))
}

/// Build the context for the next call on `session`.
pub fn assemble_context(session: &ChatSession, ctx: &PromptContext) -> AssembledContext {
    let config = session.model_config();
    let messages = &session.messages;
    let total = messages.len();
    let clear = session.clear_context_index.unwrap_or(0);

    let system_prompts = if config.enable_inject_system_prompts && needs_system_prompt(&config.model)
    {
        vec![system_prompt(config, ctx)]
    } else {
        Vec::new()
    };

    let send_memory = should_send_long_term_memory(session);
    let memory = if send_memory {
        memory_prompt_message(session)
    } else {
        None
    };

    let history = usize::try_from(config.history_message_count).unwrap_or(usize::MAX);
    let short_term_start = total.saturating_sub(history);
    let memory_start = if send_memory {
        session.last_summarize_index.min(short_term_start)
    } else {
        short_term_start
    };
    let context_start = clear.max(memory_start);

    let budget = u64::from(config.max_tokens);
    let mut recent = Vec::new();
    let mut tokens = 0u64;
    for msg in messages.iter().skip(context_start).rev() {
        if msg.is_error {
            continue;
        }
        let cost = estimate_message_tokens(msg);
        if tokens + cost > budget {
            break;
        }
        tokens += cost;
        recent.push(msg.clone());
    }
    recent.reverse();

    trace!(
        session_id = %session.id,
        context_start,
        recent = recent.len(),
        recent_tokens = tokens,
        send_memory,
        "assembled context"
    );

    AssembledContext {
        system_prompts,
        memory,
        context_prompts: session.mask.context.clone(),
        recent,
        recent_tokens: tokens,
        context_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tenx_core::messages::Role;

    fn ctx() -> PromptContext {
        PromptContext {
            lang: "en".into(),
            time: "now".into(),
        }
    }

    /// Message estimated at exactly `tokens` tokens.
    fn msg(role: Role, tokens: usize) -> ChatMessage {
        ChatMessage::new(role, "a".repeat(tokens * 4))
    }

    fn session(n: usize, tokens_each: usize, config: ModelConfig) -> ChatSession {
        let mut s = ChatSession::new();
        s.mask.model_config = config;
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            s.messages.push(msg(role, tokens_each));
        }
        s
    }

    fn plain_config() -> ModelConfig {
        ModelConfig {
            model: "llama-3".into(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn injects_system_prompt_for_gpt_models_only() {
        let gpt = session(2, 5, ModelConfig::default());
        let out = assemble_context(&gpt, &ctx());
        assert_eq!(out.system_prompts.len(), 1);
        assert!(out.system_prompts[0].text_content().contains("Current model: gpt-4o-mini"));

        let other = session(2, 5, plain_config());
        assert!(assemble_context(&other, &ctx()).system_prompts.is_empty());

        let disabled = session(
            2,
            5,
            ModelConfig {
                enable_inject_system_prompts: false,
                ..ModelConfig::default()
            },
        );
        assert!(assemble_context(&disabled, &ctx()).system_prompts.is_empty());
    }

    #[test]
    fn history_count_limits_recent_segment() {
        let config = ModelConfig {
            history_message_count: 4,
            max_tokens: 1000,
            ..plain_config()
        };
        let s = session(10, 50, config);
        let out = assemble_context(&s, &ctx());
        assert_eq!(out.recent.len(), 4);
        assert_eq!(out.recent, s.messages[6..].to_vec());
    }

    #[test]
    fn token_budget_is_not_tighter_than_needed() {
        // 10 messages of 50 tokens fit a 1000 token budget
        let config = ModelConfig {
            history_message_count: 64,
            max_tokens: 1000,
            ..plain_config()
        };
        let s = session(10, 50, config);
        let out = assemble_context(&s, &ctx());
        assert_eq!(out.recent.len(), 10);
        assert_eq!(out.recent_tokens, 500);
    }

    #[test]
    fn token_budget_stops_the_backward_walk() {
        let config = ModelConfig {
            history_message_count: 64,
            max_tokens: 120,
            ..plain_config()
        };
        let s = session(10, 50, config);
        let out = assemble_context(&s, &ctx());
        assert_eq!(out.recent.len(), 2);
        assert_eq!(out.recent, s.messages[8..].to_vec());
    }

    #[test]
    fn error_messages_are_skipped() {
        let mut s = session(4, 5, plain_config());
        s.messages[3].is_error = true;
        s.messages[1].is_error = true;
        let out = assemble_context(&s, &ctx());
        assert_eq!(out.recent, vec![s.messages[0].clone(), s.messages[2].clone()]);
    }

    #[test]
    fn all_errors_leave_only_synthesized_prompts() {
        let mut s = session(3, 5, ModelConfig::default());
        for m in &mut s.messages {
            m.is_error = true;
        }
        s.mask.context = vec![ChatMessage::system("be brief")];
        let out = assemble_context(&s, &ctx()).into_messages();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text_content(), "be brief");
    }

    #[test]
    fn clear_context_index_excludes_older_messages_and_memory() {
        let config = ModelConfig {
            history_message_count: 64,
            ..plain_config()
        };
        let mut s = session(6, 5, config);
        s.memory_prompt = "earlier summary".into();
        s.last_summarize_index = 2;
        s.clear_context_index = Some(4);
        let out = assemble_context(&s, &ctx());
        assert!(out.memory.is_none());
        assert_eq!(out.recent, s.messages[4..].to_vec());
    }

    #[test]
    fn memory_extends_window_back_to_summarize_index() {
        let config = ModelConfig {
            history_message_count: 2,
            ..plain_config()
        };
        let mut s = session(8, 5, config);
        s.memory_prompt = "they discussed lifetimes".into();
        s.last_summarize_index = 5;
        let out = assemble_context(&s, &ctx());
        let memory = out.memory.as_ref().unwrap();
        assert_eq!(memory.role, Role::System);
        assert_eq!(
            memory.text_content(),
            "This is a summary of the chat history as a recap: they discussed lifetimes"
        );
        assert_eq!(out.context_start, 5);
        assert_eq!(out.recent.len(), 3);
    }

    #[test]
    fn memory_not_sent_when_disabled() {
        let config = ModelConfig {
            send_memory: false,
            ..plain_config()
        };
        let mut s = session(4, 5, config);
        s.memory_prompt = "summary".into();
        s.last_summarize_index = 3;
        assert!(assemble_context(&s, &ctx()).memory.is_none());
    }

    #[test]
    fn zero_history_count_sends_no_recent_messages() {
        let config = ModelConfig {
            history_message_count: 0,
            ..plain_config()
        };
        let s = session(4, 5, config);
        let out = assemble_context(&s, &ctx());
        assert!(out.recent.is_empty());
    }

    #[test]
    fn output_order_is_system_memory_context_recent() {
        let config = ModelConfig {
            history_message_count: 64,
            ..ModelConfig::default()
        };
        let mut s = session(2, 5, config);
        s.memory_prompt = "m".into();
        s.last_summarize_index = 1;
        s.mask.context = vec![ChatMessage::system("ctx")];
        let out = assemble_context(&s, &ctx()).into_messages();
        assert_eq!(out.len(), 5);
        assert!(out[0].text_content().starts_with("You are ChatGPT"));
        assert!(out[1].text_content().starts_with(MEMORY_PROMPT_PREFIX));
        assert_eq!(out[2].text_content(), "ctx");
        assert_eq!(out[3].id, s.messages[0].id);
        assert_eq!(out[4].id, s.messages[1].id);
    }

    proptest! {
        #[test]
        fn recent_segment_respects_budget(
            sizes in proptest::collection::vec(0usize..80, 0..30),
            max_tokens in 0u32..600,
            history in 0u32..40,
            clear in proptest::option::of(0usize..35),
        ) {
            let mut s = ChatSession::new();
            s.mask.model_config = ModelConfig { max_tokens, history_message_count: history, ..plain_config() };
            for n in &sizes {
                s.messages.push(msg(Role::User, *n));
            }
            s.clear_context_index = clear;
            let out = assemble_context(&s, &ctx());
            prop_assert!(out.recent_tokens <= u64::from(max_tokens));
            prop_assert!(out.recent.len() <= history as usize);
            prop_assert!(out.recent.iter().all(|m| !m.is_error));
        }
    }
}
