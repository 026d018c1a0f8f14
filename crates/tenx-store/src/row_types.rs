//! Records returned by the repositories.
//!
//! These serialize in the camelCase shape the REST surface returns. Chat logs
//! use [`tenx_core::ChatLog`] directly.

use serde::{Deserialize, Serialize};
use tenx_core::UserId;
use tenx_core::session::ModelConfigOverrides;

/// A user row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User ID.
    pub user_id: UserId,
    /// Email address, for users created by email OTP.
    pub email: Option<String>,
    /// Phone number, for users created by SMS OTP.
    pub phone_number: Option<String>,
    /// Pending one-time password. Never serialized.
    #[serde(skip)]
    pub otp: Option<String>,
    /// Expiry of the pending OTP (RFC 3339). Never serialized.
    #[serde(skip)]
    pub otp_expiry: Option<String>,
    /// Whether the user completed an OTP login.
    pub is_verified: bool,
    /// Whether the account is enabled.
    pub is_active: bool,
    /// Login methods used so far (`email`, `phone`).
    pub login_methods: Vec<String>,
    /// `user` or `admin`.
    pub user_type: String,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last successful login (RFC 3339).
    pub last_login_at: Option<String>,
}

/// A stored preference document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsRecord {
    /// Owner.
    pub user_id: UserId,
    /// Opaque preference document.
    pub settings: serde_json::Value,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last update (RFC 3339).
    pub updated_at: String,
}

/// Default chat settings attached to a model configuration.
///
/// Missing fields in incoming JSON fall back to the values below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct DefaultSettings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub compress_message_length_threshold: u32,
    pub enable_inject_system_prompts: bool,
    pub template: String,
    pub history_message_count: u32,
    pub send_memory: bool,
    pub compress_model: String,
    pub compress_provider_name: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            compress_message_length_threshold: 4000,
            enable_inject_system_prompts: true,
            template: String::new(),
            history_message_count: 10,
            send_memory: true,
            compress_model: "gpt-3.5-turbo".into(),
            compress_provider_name: "openai".into(),
        }
    }
}

/// A global model configuration row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiModelRecord {
    /// Row ID.
    pub id: String,
    /// Model family key (`chat`, `image`).
    pub model_type: String,
    /// Configuration version.
    pub version: String,
    /// Model name.
    pub model: String,
    /// Provider name.
    pub provider_name: String,
    /// Defaults applied to new sessions.
    pub default_settings: DefaultSettings,
    /// Whether the configuration is served.
    pub is_active: bool,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last update (RFC 3339).
    pub updated_at: String,
}

impl AiModelRecord {
    /// The configuration as overrides on top of a client's global
    /// `ModelConfig`. An empty template is left unset.
    pub fn model_config_overrides(&self) -> ModelConfigOverrides {
        let s = &self.default_settings;
        let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_owned());
        ModelConfigOverrides {
            model: non_empty(&self.model),
            provider_name: non_empty(&self.provider_name),
            temperature: Some(s.temperature),
            top_p: Some(s.top_p),
            max_tokens: Some(s.max_tokens),
            presence_penalty: Some(s.presence_penalty),
            frequency_penalty: Some(s.frequency_penalty),
            send_memory: Some(s.send_memory),
            history_message_count: Some(s.history_message_count),
            compress_message_length_threshold: Some(s.compress_message_length_threshold),
            compress_model: Some(s.compress_model.clone()),
            compress_provider_name: Some(s.compress_provider_name.clone()),
            enable_inject_system_prompts: Some(s.enable_inject_system_prompts),
            template: non_empty(&s.template),
            ..ModelConfigOverrides::default()
        }
    }
}

/// Input for a new model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewAiModel {
    pub model_type: String,
    pub version: String,
    pub model: String,
    pub provider_name: String,
    #[serde(default)]
    pub default_settings: DefaultSettings,
}

impl NewAiModel {
    /// The configuration seeded when no active one exists.
    pub fn seed() -> Self {
        Self {
            model_type: "chat".into(),
            version: "1.0".into(),
            model: "gpt-3.5-turbo".into(),
            provider_name: "openai".into(),
            default_settings: DefaultSettings::default(),
        }
    }
}

/// Partial update of a model configuration. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct AiModelUpdate {
    pub model: Option<String>,
    pub provider_name: Option<String>,
    pub default_settings: Option<DefaultSettings>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_default_settings_fill_in() {
        let s: DefaultSettings =
            serde_json::from_value(json!({"temperature": 0.2, "historyMessageCount": 6})).unwrap();
        assert!((s.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(s.history_message_count, 6);
        assert_eq!(s.max_tokens, 2000);
        assert_eq!(s.compress_model, "gpt-3.5-turbo");
    }

    #[test]
    fn user_record_hides_otp() {
        let user = UserRecord {
            user_id: UserId::from("u1"),
            email: Some("a@b.c".into()),
            phone_number: None,
            otp: Some("123456".into()),
            otp_expiry: Some("2030-01-01T00:00:00Z".into()),
            is_verified: false,
            is_active: true,
            login_methods: vec!["email".into()],
            user_type: "user".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            last_login_at: None,
        };
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("otp").is_none());
        assert!(v.get("otpExpiry").is_none());
        assert_eq!(v["loginMethods"][0], "email");
    }

    #[test]
    fn overrides_skip_empty_template() {
        let record = AiModelRecord {
            id: "1".into(),
            model_type: "chat".into(),
            version: "1.0".into(),
            model: "gpt-4o".into(),
            provider_name: "openai".into(),
            default_settings: DefaultSettings::default(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let o = record.model_config_overrides();
        assert_eq!(o.model.as_deref(), Some("gpt-4o"));
        assert_eq!(o.max_tokens, Some(2000));
        assert!(o.template.is_none());
        assert!(o.size.is_none());
    }
}
