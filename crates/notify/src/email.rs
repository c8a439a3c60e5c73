//! SMTP email notifier.
//!
//! Renders the message itself (see [`compose`]) and hands the finished
//! text to an [`SmtpTransport`]. Credentials come from the injected
//! [`SecretProvider`] at send time, never from the channel config.

pub mod compose;

use std::sync::Arc;

use crate::config::EmailConfig;
use crate::secrets::{EnvSecrets, SecretProvider, SMTP_PASSWORD, SMTP_USERNAME};
use crate::traits::{Notifier, NotifyError};
use crate::transport::{LettreTransport, SmtpConnection, SmtpMode, SmtpTransport};

pub use compose::{build_email_body, format_recipients};

/// Sends notifications as plain-text emails.
pub struct EmailNotifier {
    config: EmailConfig,
    secrets: Arc<dyn SecretProvider>,
    transport: Arc<dyn SmtpTransport>,
}

impl EmailNotifier {
    pub fn new(
        config: EmailConfig,
        secrets: Arc<dyn SecretProvider>,
        transport: Arc<dyn SmtpTransport>,
    ) -> Self {
        Self {
            config,
            secrets,
            transport,
        }
    }

    /// Production wiring: environment credentials and the `lettre` transport.
    pub fn from_config(config: EmailConfig) -> Self {
        Self::new(config, Arc::new(EnvSecrets), Arc::new(LettreTransport))
    }

    /// Connection parameters for this channel, or
    /// [`NotifyError::CredentialsMissing`] if either credential is unset.
    pub fn connection(&self) -> Result<SmtpConnection, NotifyError> {
        let (Some(username), Some(password)) = (
            self.secrets.get(SMTP_USERNAME),
            self.secrets.get(SMTP_PASSWORD),
        ) else {
            return Err(NotifyError::CredentialsMissing);
        };

        Ok(SmtpConnection {
            host: self.config.smtp_host.clone(),
            port: self.config.smtp_port,
            mode: SmtpMode::from_config(&self.config),
            skip_verify: self.config.skip_verify,
            username,
            password,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send `message` with `title` as the subject to every recipient.
    async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let connection = self.connection()?;
        let body = build_email_body(&self.config, title, message);

        self.transport
            .submit(&connection, &self.config.from, &self.config.to, &body)
            .await
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}
