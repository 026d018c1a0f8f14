//! OTP delivery.
//!
//! [`OtpDelivery`] is the seam to the outside world. [`DeliveryRouter`] picks
//! an implementation per identifier: email goes to the mail gateway, phone
//! numbers to Twilio. A channel without credentials falls back to
//! [`LogOnlyDelivery`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tenx_core::text::mask_identifier;
use tenx_settings::{MailSettings, OtpSettings, TwilioSettings};
use tracing::{info, warn};

use crate::errors::{AuthError, Result};
use crate::identifier::Identifier;

const SUBJECT: &str = "Your Login OTP";

fn otp_text(otp: &str, ttl_minutes: u64) -> String {
    format!("Your OTP is: {otp}. It will expire in {ttl_minutes} minutes.")
}

fn otp_html(otp: &str, ttl_minutes: u64) -> String {
    format!("<p>Your OTP is: <strong>{otp}</strong></p><p>It will expire in {ttl_minutes} minutes.</p>")
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

async fn check_status(channel: &'static str, resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let message = resp.text().await.unwrap_or_default();
    Err(AuthError::Delivery {
        channel,
        status: status.as_u16(),
        message,
    })
}

/// Sends a code to a recipient.
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    /// Channel name used in logs and errors.
    fn channel(&self) -> &'static str;

    /// Deliver `otp` to `to`.
    async fn deliver(&self, to: &str, otp: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Twilio
// ─────────────────────────────────────────────────────────────────────────────

/// SMS through the Twilio Messages API.
pub struct TwilioSmsDelivery {
    http: reqwest::Client,
    settings: TwilioSettings,
    ttl_minutes: u64,
}

impl TwilioSmsDelivery {
    /// Build from settings.
    pub fn new(settings: TwilioSettings, ttl_minutes: u64, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            settings,
            ttl_minutes,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.account_sid
        )
    }
}

#[async_trait]
impl OtpDelivery for TwilioSmsDelivery {
    fn channel(&self) -> &'static str {
        "sms"
    }

    #[tracing::instrument(skip_all, fields(to = %mask_identifier(to)))]
    async fn deliver(&self, to: &str, otp: &str) -> Result<()> {
        let body = otp_text(otp, self.ttl_minutes);
        let resp = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&[
                ("To", to),
                ("From", self.settings.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await?;
        check_status(self.channel(), resp).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mail gateway
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MailBody<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
    html: String,
}

/// Email through an HTTP mail gateway accepting JSON messages.
pub struct HttpMailDelivery {
    http: reqwest::Client,
    settings: MailSettings,
    ttl_minutes: u64,
}

impl HttpMailDelivery {
    /// Build from settings.
    pub fn new(settings: MailSettings, ttl_minutes: u64, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            settings,
            ttl_minutes,
        })
    }
}

#[async_trait]
impl OtpDelivery for HttpMailDelivery {
    fn channel(&self) -> &'static str {
        "email"
    }

    #[tracing::instrument(skip_all, fields(to = %mask_identifier(to)))]
    async fn deliver(&self, to: &str, otp: &str) -> Result<()> {
        let body = MailBody {
            from: &self.settings.from_address,
            to,
            subject: SUBJECT,
            text: otp_text(otp, self.ttl_minutes),
            html: otp_html(otp, self.ttl_minutes),
        };
        let mut req = self.http.post(&self.settings.endpoint).json(&body);
        if !self.settings.api_key.is_empty() {
            req = req.bearer_auth(&self.settings.api_key);
        }
        let resp = req.send().await?;
        check_status(self.channel(), resp).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Log only
// ─────────────────────────────────────────────────────────────────────────────

/// Records deliveries in memory and logs the masked recipient. Used when a
/// channel has no credentials, and in tests.
#[derive(Default)]
pub struct LogOnlyDelivery {
    channel: &'static str,
    sent: Mutex<Vec<(String, String)>>,
}

impl LogOnlyDelivery {
    /// A log-only channel with the given name.
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// `(recipient, code)` pairs delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// Most recent code sent to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(r, _)| r == to)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpDelivery for LogOnlyDelivery {
    fn channel(&self) -> &'static str {
        self.channel
    }

    async fn deliver(&self, to: &str, otp: &str) -> Result<()> {
        info!(channel = self.channel, to = %mask_identifier(to), "OTP delivery skipped, channel not configured");
        self.sent.lock().push((to.to_owned(), otp.to_owned()));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Picks the delivery channel by identifier kind.
#[derive(Clone)]
pub struct DeliveryRouter {
    email: Arc<dyn OtpDelivery>,
    sms: Arc<dyn OtpDelivery>,
}

impl DeliveryRouter {
    /// Router over explicit channels.
    pub fn new(email: Arc<dyn OtpDelivery>, sms: Arc<dyn OtpDelivery>) -> Self {
        Self { email, sms }
    }

    /// Build channels from settings. Unconfigured channels log instead of
    /// sending.
    pub fn from_settings(settings: &OtpSettings, timeout: Duration) -> Result<Self> {
        let ttl_minutes = settings.ttl_secs.div_ceil(60);

        let email: Arc<dyn OtpDelivery> = if settings.mail.is_configured() {
            Arc::new(HttpMailDelivery::new(settings.mail.clone(), ttl_minutes, timeout)?)
        } else {
            warn!("mail gateway not configured, email OTPs will only be logged");
            Arc::new(LogOnlyDelivery::new("email"))
        };
        let sms: Arc<dyn OtpDelivery> = if settings.twilio.is_configured() {
            Arc::new(TwilioSmsDelivery::new(settings.twilio.clone(), ttl_minutes, timeout)?)
        } else {
            warn!("twilio not configured, SMS OTPs will only be logged");
            Arc::new(LogOnlyDelivery::new("sms"))
        };
        Ok(Self { email, sms })
    }

    /// Deliver `otp` over the channel matching `identifier`.
    pub async fn send(&self, identifier: &Identifier, otp: &str) -> Result<()> {
        let channel = match identifier {
            Identifier::Email(_) => &self.email,
            Identifier::Phone(_) => &self.sms,
        };
        channel.deliver(identifier.as_str(), otp).await
    }
}
