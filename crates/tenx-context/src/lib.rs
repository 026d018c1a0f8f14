//! # tenx-context
//!
//! Decides what a model call sees.
//!
//! - [`template`]: fills `{{model}}`, `{{time}}`, `{{lang}}`, `{{cutoff}}`,
//!   `{{ServiceProvider}}` and `{{input}}` placeholders
//! - [`assembler`]: builds the outbound message list from a session
//!   (system prompt, long-term memory, mask context, recent history)
//! - [`summarizer`]: decides when to title a session or compress its history
//!   into the memory prompt, and which model does it
//!
//! Everything here is synchronous and side-effect free. Running the planned
//! model calls is left to the caller.

#![deny(unsafe_code)]

pub mod assembler;
pub mod constants;
pub mod summarizer;
pub mod template;

pub use assembler::{AssembledContext, assemble_context};
pub use summarizer::{
    CompressionPlan, SummarizeModel, TitlePlan, is_image_model, plan_compression, plan_title,
    select_summarize_model,
};
pub use template::{PromptContext, fill_template_with};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizer_helpers_are_reachable_from_crate_root() {
        assert!(is_image_model("dall-e-3"));
        assert!(!is_image_model("gpt-4o-mini"));
        let config = tenx_core::ModelConfig::default();
        assert!(!select_summarize_model(&config, &[]).model.is_empty());
    }
}
