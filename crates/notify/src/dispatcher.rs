//! Fans a notification out to every configured channel.
//!
//! Individual channel failures don't block other channels. Each outcome
//! is logged and returned as a [`DispatchResult`].

use std::sync::Arc;

use crate::config::{ChannelConfig, NotifyConfig};
use crate::email::EmailNotifier;
use crate::params::ParameterResolver;
use crate::secrets::SecretProvider;
use crate::traits::{DispatchResult, Notifier, NotifyError};
use crate::transport::{HttpTransport, LettreTransport, ReqwestTransport};
use crate::webhook::WebhookNotifier;

/// Build the production notifier for one channel.
pub fn build_notifier(
    config: &ChannelConfig,
    resolver: Arc<dyn ParameterResolver>,
    secrets: Arc<dyn SecretProvider>,
) -> Result<Box<dyn Notifier>, NotifyError> {
    Ok(match config {
        ChannelConfig::Webhook(hook) => {
            let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
            Box::new(WebhookNotifier::new(hook.clone(), resolver, secrets, transport))
        }
        ChannelConfig::Email(email) => Box::new(EmailNotifier::new(
            email.clone(),
            secrets,
            Arc::new(LettreTransport),
        )),
    })
}

/// Delivers notifications to a fixed list of channels.
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn with_channels(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Build one production notifier per configured channel.
    pub fn from_config(
        config: &NotifyConfig,
        resolver: Arc<dyn ParameterResolver>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Result<Self, NotifyError> {
        let channels = config
            .channels
            .iter()
            .map(|channel| build_notifier(channel, resolver.clone(), secrets.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_channels(channels))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send to every channel in order.
    pub async fn dispatch(&self, title: &str, message: &str) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!("No notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            results.push(Self::deliver(channel.as_ref(), title, message).await);
        }
        results
    }

    /// Send to the channel at `index` only.
    pub async fn dispatch_to(
        &self,
        index: usize,
        title: &str,
        message: &str,
    ) -> Result<DispatchResult, NotifyError> {
        let channel = self.channel(index)?;
        Ok(Self::deliver(channel, title, message).await)
    }

    /// Send the channel's test notification.
    pub async fn test_notify(&self, index: usize) -> Result<(), NotifyError> {
        self.channel(index)?.test().await
    }

    fn channel(&self, index: usize) -> Result<&dyn Notifier, NotifyError> {
        self.channels
            .get(index)
            .map(|c| c.as_ref())
            .ok_or_else(|| NotifyError::Config(format!("Channel index {index} out of range")))
    }

    async fn deliver(channel: &dyn Notifier, title: &str, message: &str) -> DispatchResult {
        let start = std::time::Instant::now();
        let result = channel.send(title, message).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, retryable, error) = match result {
            Ok(()) => {
                tracing::info!(
                    channel = channel.channel_name(),
                    duration_ms,
                    "Notification delivered"
                );
                (true, false, None)
            }
            Err(e) => {
                tracing::warn!(
                    channel = channel.channel_name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    duration_ms,
                    "Notification delivery failed"
                );
                (false, e.is_retryable(), Some(e.to_string()))
            }
        };

        DispatchResult {
            channel: channel.channel_name().to_string(),
            success,
            retryable,
            error,
            duration_ms,
        }
    }
}
