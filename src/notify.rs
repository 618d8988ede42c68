//! SMS and email delivery.
//!
//! Notification channels sit behind the [`Notifier`] trait so the webhook
//! orchestrator only ever emits "send this body to this recipient" and each
//! channel can be swapped independently. Both built-in channels are
//! optional: absent credentials make them a logged no-op returning `false`,
//! and nothing in this module ever throws past its boundary.

use async_trait::async_trait;

const SMS_MAX_CHARS: usize = 1600;

/// A delivery channel. Returns `true` only on a confirmed send.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// Twilio SMS channel. Reads `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
/// and `TWILIO_PHONE_NUMBER` from the environment at send time.
pub struct TwilioSms {
    client: reqwest::Client,
    api_base: String,
}

impl TwilioSms {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: "https://api.twilio.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

impl Default for TwilioSms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for TwilioSms {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> bool {
        let (sid, token, from) = match (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_PHONE_NUMBER"),
        ) {
            (Ok(sid), Ok(token), Ok(from)) => (sid, token, from),
            _ => {
                tracing::warn!("Twilio not configured, SMS sending is disabled");
                return false;
            }
        };

        if to.is_empty() || body.is_empty() {
            tracing::warn!("SMS skipped: missing recipient or body");
            return false;
        }

        let normalized = normalize_phone(to);
        let truncated: String = body.chars().take(SMS_MAX_CHARS).collect();
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, sid
        );

        let resp = self
            .client
            .post(&url)
            .basic_auth(&sid, Some(&token))
            .form(&[
                ("To", normalized.as_str()),
                ("From", from.as_str()),
                ("Body", truncated.as_str()),
            ])
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                tracing::info!(to = %normalized, "SMS sent");
                true
            }
            Ok(r) => {
                tracing::warn!(status = %r.status(), "SMS send failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "SMS send failed");
                false
            }
        }
    }
}

/// Normalize a caller number to E.164. Bare 10-digit numbers are assumed
/// to be Indian and get a +91 prefix.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("+91{}", digits)
    } else if digits.len() > 10 {
        format!("+{}", digits)
    } else {
        digits
    }
}

/// SendGrid email channel. Reads `SENDGRID_API_KEY` and `SENDGRID_FROM`
/// from the environment at send time.
pub struct SendgridEmail {
    client: reqwest::Client,
    api_url: String,
}

impl SendgridEmail {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: "https://api.sendgrid.com/v3/mail/send".to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl Default for SendgridEmail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for SendgridEmail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let (api_key, from) = match (
            std::env::var("SENDGRID_API_KEY"),
            std::env::var("SENDGRID_FROM"),
        ) {
            (Ok(k), Ok(f)) => (k, f),
            _ => {
                tracing::warn!("SendGrid not configured, email sending is disabled");
                return false;
            }
        };

        if to.is_empty() || body.is_empty() {
            tracing::warn!("email skipped: missing recipient or body");
            return false;
        }

        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": from },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                tracing::info!(to, "follow-up email sent");
                true
            }
            Ok(r) => {
                tracing::warn!(status = %r.status(), "email send failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "email send failed");
                false
            }
        }
    }
}

/// Channel that drops everything; used in tests and when a channel is
/// administratively disabled.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> bool {
        false
    }
}
