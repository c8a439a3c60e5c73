//! Channel configuration types, loaded from a YAML channel file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::traits::NotifyError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Top-level config ──────────────────────────────────────────

/// Every channel a notification should be delivered to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl NotifyConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, NotifyError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| NotifyError::Config(format!("invalid channel file: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NotifyError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }
}

/// A single notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ChannelConfig {
    Webhook(WebhookConfig),
    Email(EmailConfig),
}

// ── Webhook ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfig {
    /// Target URL. Falls back to `WEBHOOK_URL` when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method, POST when unset.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// `bearer`, `basic` or `apikey` (case-insensitive).
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub auth_username: Option<String>,
    #[serde(default)]
    pub auth_password: Option<String>,
    /// Header name for `apikey` auth, `X-API-Key` when unset.
    #[serde(default)]
    pub auth_header: Option<String>,
    #[serde(default)]
    pub custom_payload: Option<CustomPayload>,
    #[serde(default)]
    pub retries: u32,
    /// Request timeout in seconds; 0 means the default.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl WebhookConfig {
    pub fn timeout_secs(&self) -> u64 {
        if self.timeout > 0 {
            self.timeout
        } else {
            DEFAULT_TIMEOUT_SECS
        }
    }
}

/// User-defined payload shape for a webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomPayload {
    /// Structural template. `{{.Title}}`-style references go to the
    /// template engine, other `{{...}}` spans to the parameter resolver.
    #[serde(default)]
    pub template: Option<String>,
    /// Extra fields; values may contain placeholders.
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub title_field: Option<String>,
    #[serde(default)]
    pub message_field: Option<String>,
    #[serde(default)]
    pub include_title: bool,
    #[serde(default)]
    pub include_message: bool,
    #[serde(default)]
    pub content_type: Option<String>,
}

// ── Email ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from: String,
    /// Recipients, rendered in order.
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    /// Connect with implicit TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Upgrade a plaintext connection with STARTTLS.
    #[serde(default)]
    pub use_starttls: bool,
    /// Accept invalid server certificates.
    #[serde(default)]
    pub skip_verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_defaults() {
        let config = NotifyConfig::from_yaml("channels:\n  - channel: webhook\n").unwrap();
        let ChannelConfig::Webhook(hook) = &config.channels[0] else {
            panic!("expected webhook channel");
        };
        assert_eq!(hook.url, None);
        assert_eq!(hook.retries, 0);
        assert_eq!(hook.timeout_secs(), 30);
        assert!(!hook.skip_tls_verify);
        assert!(hook.custom_payload.is_none());
    }

    #[test]
    fn parse_full_channel_file() {
        let yaml = r#"
channels:
  - channel: webhook
    url: "https://hooks.example.com/{{SITE}}"
    method: put
    headers:
      X-Source: signalpost
    auth_type: apikey
    auth_token: "{{API_TOKEN}}"
    auth_header: X-Token
    retries: 3
    timeout: 5
    custom_payload:
      template: '{"text": "{{.Title}}"}'
      fields:
        team: ops
      title_field: alert
      include_title: true
  - channel: email
    smtp_host: smtp.example.com
    smtp_port: 465
    from: alerts@example.com
    to: [a@example.com, b@example.com]
    use_tls: true
"#;
        let config = NotifyConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.channels.len(), 2);

        let ChannelConfig::Webhook(hook) = &config.channels[0] else {
            panic!("expected webhook channel");
        };
        assert_eq!(hook.method.as_deref(), Some("put"));
        assert_eq!(hook.retries, 3);
        assert_eq!(hook.timeout_secs(), 5);
        assert_eq!(hook.headers["X-Source"], "signalpost");
        let custom = hook.custom_payload.as_ref().unwrap();
        assert_eq!(custom.fields["team"], "ops");
        assert_eq!(custom.title_field.as_deref(), Some("alert"));
        assert!(custom.include_title);
        assert!(!custom.include_message);

        let ChannelConfig::Email(email) = &config.channels[1] else {
            panic!("expected email channel");
        };
        assert_eq!(email.smtp_port, 465);
        assert_eq!(email.to, vec!["a@example.com", "b@example.com"]);
        assert!(email.use_tls);
        assert!(!email.use_starttls);
        assert_eq!(email.reply_to, None);
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let result = NotifyConfig::from_yaml("channels:\n  - channel: pager\n");
        match result {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("invalid channel file")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }
}
