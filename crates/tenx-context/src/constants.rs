//! Fixed prompts and thresholds.

/// System prompt injected for GPT-family models.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "\
You are ChatGPT, a large language model trained by {{ServiceProvider}}.
Knowledge cutoff: {{cutoff}}
Current model: {{model}}
Current time: {{time}}
Latex inline: \\(x^2\\)
Latex block: $$e=mc^2$$
";

/// Prefix of the long-term memory system message.
pub const MEMORY_PROMPT_PREFIX: &str = "This is a summary of the chat history as a recap: ";

/// Instruction appended when asking for a session title.
pub const TOPIC_PROMPT: &str = "Please generate a four to five word title summarizing our \
conversation without any lead-in, punctuation, quotation marks, periods, symbols, bold text, \
or additional text. Remove enclosing quotation marks.";

/// Instruction appended when asking for a history summary.
pub const SUMMARIZE_PROMPT: &str =
    "Summarize the discussion briefly in 200 words or less to use as a prompt for future context.";

/// Estimated tokens a session must reach before it is auto-titled.
pub const TITLE_MIN_TOKENS: u64 = 50;

/// Budget used by compression when a session has `max_tokens == 0`.
pub const FALLBACK_MAX_TOKENS: u32 = 4000;

/// Model name prefixes that receive the injected system prompt.
pub const SYSTEM_PROMPT_MODEL_PREFIXES: &[&str] = &["gpt-", "chatgpt-"];

/// Model name prefixes of image generation models, which are never summarized.
pub const IMAGE_MODEL_PREFIXES: &[&str] = &["dall-e"];

/// Known training cutoffs. Models not listed use
/// [`tenx_core::constants::DEFAULT_KNOWLEDGE_CUTOFF`].
pub const KNOWLEDGE_CUTOFFS: &[(&str, &str)] = &[
    ("gpt-4-turbo", "2023-12"),
    ("gpt-4-turbo-2024-04-09", "2023-12"),
    ("gpt-4-turbo-preview", "2023-12"),
    ("gpt-4o", "2023-10"),
    ("gpt-4o-2024-05-13", "2023-10"),
    ("gpt-4o-2024-08-06", "2023-10"),
    ("gpt-4o-mini", "2023-10"),
    ("gpt-4-vision-preview", "2023-04"),
    ("gemini-pro", "2023-12"),
    ("gemini-pro-vision", "2023-12"),
];
