//! Package-level constants.

/// Current version of the service (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "tenx";

/// Placeholder topic of a session that has not been titled yet.
pub const DEFAULT_TOPIC: &str = "New Conversation";

/// Greeting shown in an empty session.
pub const BOT_HELLO: &str = "Hello! How can I assist you today?";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default provider display name.
pub const DEFAULT_PROVIDER: &str = "OpenAI";

/// Default language code.
pub const DEFAULT_LANG: &str = "en";

/// Default mask avatar key.
pub const DEFAULT_MASK_AVATAR: &str = "gpt-bot";

/// Template that passes user input through unchanged.
pub const DEFAULT_INPUT_TEMPLATE: &str = "{{input}}";

/// Lightweight model used to summarize GPT sessions.
pub const SUMMARIZE_MODEL: &str = "gpt-4o-mini";

/// Model used to summarize Gemini sessions.
pub const GEMINI_SUMMARIZE_MODEL: &str = "gemini-pro";

/// Knowledge cutoff reported when a model has no specific entry.
pub const DEFAULT_KNOWLEDGE_CUTOFF: &str = "2021-09";

/// Header that carries the principal identifier.
pub const USER_ID_HEADER: &str = "user-id";
