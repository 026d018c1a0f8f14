//! Prompt template filling.

use tenx_core::constants::{DEFAULT_INPUT_TEMPLATE, DEFAULT_KNOWLEDGE_CUTOFF, DEFAULT_LANG};
use tenx_core::session::ModelConfig;

use crate::constants::KNOWLEDGE_CUTOFFS;

const INPUT_VAR: &str = "{{input}}";

/// Ambient values substituted into templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptContext {
    /// Language code for `{{lang}}`.
    pub lang: String,
    /// Rendered current time for `{{time}}`.
    pub time: String,
}

impl PromptContext {
    /// Context stamped with the current local time.
    pub fn now(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            time: chrono::Local::now()
                .format("%a %b %d %Y %H:%M:%S GMT%z")
                .to_string(),
        }
    }
}

impl Default for PromptContext {
    fn default() -> Self {
        Self::now(DEFAULT_LANG)
    }
}

/// Training cutoff of a model.
pub fn knowledge_cutoff(model: &str) -> &'static str {
    KNOWLEDGE_CUTOFFS
        .iter()
        .find(|(name, _)| *name == model)
        .map_or(DEFAULT_KNOWLEDGE_CUTOFF, |(_, cutoff)| cutoff)
}

/// Render `config.template` around `input`.
///
/// - input that already starts with the template is not wrapped again
/// - a template without `{{input}}` gets it appended on a new line
pub fn fill_template_with(input: &str, config: &ModelConfig, ctx: &PromptContext) -> String {
    let mut output = if config.template.is_empty() {
        DEFAULT_INPUT_TEMPLATE.to_string()
    } else {
        config.template.clone()
    };

    if input.starts_with(&output) {
        output.clear();
    }
    if !output.contains(INPUT_VAR) {
        output.push('\n');
        output.push_str(INPUT_VAR);
    }

    let provider = if config.provider_name.is_empty() {
        "OpenAI"
    } else {
        config.provider_name.as_str()
    };

    // input goes last so placeholders typed by the user stay literal
    output
        .replace("{{ServiceProvider}}", provider)
        .replace("{{cutoff}}", knowledge_cutoff(&config.model))
        .replace("{{model}}", &config.model)
        .replace("{{time}}", &ctx.time)
        .replace("{{lang}}", &ctx.lang)
        .replace(INPUT_VAR, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SYSTEM_TEMPLATE;

    fn ctx() -> PromptContext {
        PromptContext {
            lang: "en".into(),
            time: "Mon Jan 01 2024 00:00:00 GMT+0000".into(),
        }
    }

    #[test]
    fn default_template_passes_input_through() {
        let out = fill_template_with("hello", &ModelConfig::default(), &ctx());
        assert_eq!(out, "hello");
    }

    #[test]
    fn template_without_input_var_gets_it_appended() {
        let config = ModelConfig {
            template: "Answer in {{lang}}.".into(),
            ..ModelConfig::default()
        };
        assert_eq!(fill_template_with("hi", &config, &ctx()), "Answer in en.\nhi");
    }

    #[test]
    fn input_already_templated_is_not_wrapped_twice() {
        let config = ModelConfig {
            template: "Q:".into(),
            ..ModelConfig::default()
        };
        assert_eq!(fill_template_with("Q: why", &config, &ctx()), "\nQ: why");
    }

    #[test]
    fn system_template_fills_all_vars() {
        let config = ModelConfig {
            model: "gpt-4o".into(),
            template: DEFAULT_SYSTEM_TEMPLATE.into(),
            ..ModelConfig::default()
        };
        let out = fill_template_with("", &config, &ctx());
        assert!(out.contains("trained by OpenAI"));
        assert!(out.contains("Knowledge cutoff: 2023-10"));
        assert!(out.contains("Current model: gpt-4o"));
        assert!(out.contains("Current time: Mon Jan 01 2024"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn user_placeholders_are_not_expanded() {
        let out = fill_template_with("print {{model}}", &ModelConfig::default(), &ctx());
        assert_eq!(out, "print {{model}}");
    }

    #[test]
    fn unknown_model_uses_default_cutoff() {
        assert_eq!(knowledge_cutoff("my-local-llm"), DEFAULT_KNOWLEDGE_CUTOFF);
    }
}
