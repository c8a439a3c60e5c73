//! Notification delivery for signalpost alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Webhook and SMTP email notifier implementations
//! - Payload templating with `{{PARAM}}` placeholders and `{{.Field}}` references
//! - Bearer, basic and API-key authentication for webhooks
//! - Dispatcher that fans notifications out to configured channels

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod email;
pub mod params;
pub mod payload;
pub mod secrets;
pub mod templating;
pub mod traits;
pub mod transport;
pub mod webhook;

pub use config::{ChannelConfig, CustomPayload, EmailConfig, NotifyConfig, WebhookConfig};
pub use dispatcher::{build_notifier, Dispatcher};
pub use email::EmailNotifier;
pub use params::{ParameterResolver, PlaceholderResolver};
pub use payload::{build_payload, PayloadBody, PayloadError, ResolvedPayload};
pub use secrets::{EnvSecrets, SecretProvider, StaticSecrets};
pub use traits::{DispatchResult, Notifier, NotifyError, WebhookError};
pub use webhook::WebhookNotifier;
