//! SMTP submission via `lettre`.

use std::fmt;

use lettre::address::Envelope;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::config::EmailConfig;
use crate::traits::NotifyError;

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpMode {
    /// Unencrypted session.
    Plain,
    /// TLS from the first byte (usually port 465).
    ImplicitTls,
    /// Plaintext upgraded with STARTTLS (usually port 587).
    StartTls,
}

impl SmtpMode {
    /// `use_tls` wins over `use_starttls`; neither means plain.
    pub fn from_config(config: &EmailConfig) -> Self {
        if config.use_tls {
            SmtpMode::ImplicitTls
        } else if config.use_starttls {
            SmtpMode::StartTls
        } else {
            SmtpMode::Plain
        }
    }
}

/// Resolved connection parameters for one submission.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConnection {
    pub host: String,
    pub port: u16,
    pub mode: SmtpMode,
    pub skip_verify: bool,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mode", &self.mode)
            .field("skip_verify", &self.skip_verify)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connects, authenticates and submits one pre-rendered message.
#[async_trait::async_trait]
pub trait SmtpTransport: Send + Sync {
    async fn submit(
        &self,
        connection: &SmtpConnection,
        from: &str,
        to: &[String],
        body: &str,
    ) -> Result<(), NotifyError>;
}

/// [`SmtpTransport`] backed by `lettre`'s async SMTP client.
///
/// A transport is built per submission from the resolved connection, so
/// each notifier can target its own server and TLS posture.
#[derive(Debug, Clone, Copy, Default)]
pub struct LettreTransport;

impl LettreTransport {
    fn build(connection: &SmtpConnection) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&connection.host)
            .port(connection.port)
            .credentials(Credentials::new(
                connection.username.clone(),
                connection.password.clone(),
            ));

        let builder = match connection.mode {
            SmtpMode::Plain => builder.tls(Tls::None),
            SmtpMode::ImplicitTls => builder.tls(Tls::Wrapper(tls_parameters(connection)?)),
            SmtpMode::StartTls => builder.tls(Tls::Required(tls_parameters(connection)?)),
        };

        Ok(builder.build())
    }
}

#[async_trait::async_trait]
impl SmtpTransport for LettreTransport {
    async fn submit(
        &self,
        connection: &SmtpConnection,
        from: &str,
        to: &[String],
        body: &str,
    ) -> Result<(), NotifyError> {
        let envelope = envelope(from, to)?;
        let transport = Self::build(connection)?;

        transport
            .send_raw(&envelope, body.as_bytes())
            .await
            .map_err(|e| {
                NotifyError::Smtp(format!(
                    "failed to send email via {}:{}: {e}",
                    connection.host, connection.port
                ))
            })?;

        tracing::debug!(
            channel = "email",
            host = %connection.host,
            recipients = to.len(),
            "email submitted"
        );
        Ok(())
    }
}

fn tls_parameters(connection: &SmtpConnection) -> Result<TlsParameters, NotifyError> {
    TlsParameters::builder(connection.host.clone())
        .dangerous_accept_invalid_certs(connection.skip_verify)
        .build()
        .map_err(|e| NotifyError::Smtp(format!("TLS configuration error: {e}")))
}

/// Envelope addresses; display names (`Alerts <a@x.com>`) are accepted.
fn envelope(from: &str, to: &[String]) -> Result<Envelope, NotifyError> {
    let from = parse_address(from)?;
    let to = to
        .iter()
        .map(|addr| parse_address(addr))
        .collect::<Result<Vec<_>, _>>()?;

    Envelope::new(Some(from), to).map_err(|e| NotifyError::Smtp(format!("invalid envelope: {e}")))
}

fn parse_address(addr: &str) -> Result<Address, NotifyError> {
    addr.parse::<Mailbox>()
        .map(|mailbox| mailbox.email)
        .map_err(|e| NotifyError::Config(format!("invalid email address '{addr}': {e}")))
}
