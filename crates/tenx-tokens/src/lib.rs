//! # tenx-tokens
//!
//! Token estimation and usage accounting.
//!
//! Token counts here are estimates derived from character classes, not real
//! tokenizer output. They drive the context budget, the summarization
//! thresholds and the per-session counters.
//!
//! - [`estimate_token_length`]: cost of a string
//! - [`count_messages`]: cost of a message list
//! - [`StatRecorder`]: per-session counters
//! - [`usage_for_messages`]: prompt/completion split for the remote mirror

#![deny(unsafe_code)]

pub mod estimator;
pub mod stats;
pub mod usage;

pub use estimator::{count_messages, estimate_message_tokens, estimate_token_length};
pub use stats::StatRecorder;
pub use usage::{usage_for_completion, usage_for_messages};
