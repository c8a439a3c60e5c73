//! Notifier trait definition and shared error types.

use crate::payload::PayloadError;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("SMTP credentials not found: SMTP_USERNAME and SMTP_PASSWORD must be set")]
    CredentialsMissing,

    #[error("failed to build webhook payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("failed to marshal payload: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

impl NotifyError {
    /// Whether the transport classified this failure as worth re-attempting.
    ///
    /// Only webhook transport failures carry a classification; every other
    /// kind is fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::Webhook(e) if e.retryable)
    }
}

/// A classified webhook delivery failure.
///
/// Built by the HTTP transport. The webhook notifier forwards it to the
/// caller without reinterpreting the status code or the retry flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WebhookError {
    /// HTTP status code, when a response was received.
    pub status_code: Option<u16>,
    /// Response body snippet (empty when no response was received).
    pub body: String,
    /// Whether the transport considers the failure transient.
    pub retryable: bool,
    /// Human-readable description, naming the failing stage.
    pub message: String,
}

impl WebhookError {
    /// A failure that happened before any response was received.
    pub fn network(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            status_code: None,
            body: String::new(),
            retryable,
            message: message.into(),
        }
    }

    /// A non-2xx response.
    pub fn status(status_code: u16, body: String, retryable: bool) -> Self {
        Self {
            message: format!("webhook returned {status_code}: {body}"),
            status_code: Some(status_code),
            body,
            retryable,
        }
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        self.send(
            "[TEST] signalpost notification test",
            "This is a test notification from signalpost.",
        )
        .await
    }

    /// Human-readable name for this channel (e.g., "webhook", "email").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub retryable: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
