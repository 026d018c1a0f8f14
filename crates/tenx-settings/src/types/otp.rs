//! One-time password settings.

use serde::{Deserialize, Serialize};

/// Twilio SMS credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwilioSettings {
    /// API base URL.
    pub base_url: String,
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: String,
    /// Sender phone number.
    pub from_number: String,
}

impl Default for TwilioSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.twilio.com".to_string(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
        }
    }
}

impl TwilioSettings {
    /// Whether enough credentials are present to send SMS.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

/// HTTP mail gateway.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailSettings {
    /// Endpoint accepting `{from, to, subject, text, html}` as JSON.
    pub endpoint: String,
    /// Bearer token for the gateway.
    pub api_key: String,
    /// Sender address.
    pub from_address: String,
}

impl MailSettings {
    /// Whether a gateway endpoint is configured.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

/// OTP issuance and delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtpSettings {
    /// Validity window in seconds.
    pub ttl_secs: u64,
    /// SMS delivery.
    pub twilio: TwilioSettings,
    /// Email delivery.
    pub mail: MailSettings,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            twilio: TwilioSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_ten_minutes() {
        assert_eq!(OtpSettings::default().ttl_secs, 600);
    }

    #[test]
    fn unconfigured_by_default() {
        let s = OtpSettings::default();
        assert!(!s.twilio.is_configured());
        assert!(!s.mail.is_configured());
    }
}
