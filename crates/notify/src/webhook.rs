//! Generic HTTP webhook notifier.
//!
//! Builds the payload, resolves method, URL and headers through the
//! [`ParameterResolver`], applies authentication and hands the request
//! to an [`HttpTransport`]. Retry and failure classification belong to
//! the transport; its [`WebhookError`](crate::WebhookError) is passed
//! through unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::apply_auth;
use crate::config::WebhookConfig;
use crate::params::ParameterResolver;
use crate::payload::build_payload;
use crate::secrets::{EnvSecrets, SecretProvider, WEBHOOK_URL};
use crate::traits::{Notifier, NotifyError};
use crate::transport::{HttpTransport, ReqwestTransport, WebhookRequest};

/// Delivers notifications to a configured HTTP endpoint.
pub struct WebhookNotifier {
    config: WebhookConfig,
    resolver: Arc<dyn ParameterResolver>,
    secrets: Arc<dyn SecretProvider>,
    transport: Arc<dyn HttpTransport>,
}

impl WebhookNotifier {
    pub fn new(
        config: WebhookConfig,
        resolver: Arc<dyn ParameterResolver>,
        secrets: Arc<dyn SecretProvider>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config,
            resolver,
            secrets,
            transport,
        }
    }

    /// Production wiring: environment fallback URL and the `reqwest`
    /// transport.
    pub fn from_config(
        config: WebhookConfig,
        resolver: Arc<dyn ParameterResolver>,
    ) -> Result<Self, NotifyError> {
        Ok(Self::new(
            config,
            resolver,
            Arc::new(EnvSecrets),
            Arc::new(ReqwestTransport::new()?),
        ))
    }

    /// Assemble the request for one notification without sending it.
    pub fn build_request(&self, title: &str, message: &str) -> Result<WebhookRequest, NotifyError> {
        let resolver = self.resolver.as_ref();

        let url = self
            .config
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.secrets.get(WEBHOOK_URL))
            .ok_or_else(|| NotifyError::Config("webhook URL not configured".to_string()))?;
        let url = resolver.resolve(&url);

        let payload = build_payload(title, message, self.config.custom_payload.as_ref(), resolver)?;

        let method = match self.config.method.as_deref().filter(|m| !m.is_empty()) {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        let mut headers: HashMap<String, String> = self
            .config
            .headers
            .iter()
            .map(|(key, value)| (key.clone(), resolver.resolve(value)))
            .collect();
        apply_auth(&mut headers, &self.config, resolver);

        let body = payload.to_bytes().map_err(NotifyError::Encoding)?;

        Ok(WebhookRequest {
            url,
            method,
            body,
            content_type: payload.content_type,
            headers,
            max_retries: self.config.retries,
            timeout_secs: self.config.timeout_secs(),
            skip_tls_verify: self.config.skip_tls_verify,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let request = self.build_request(title, message)?;
        self.transport.execute(&request).await?;
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PlaceholderResolver;
    use crate::secrets::StaticSecrets;
    use crate::traits::WebhookError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        requests: Mutex<Vec<WebhookRequest>>,
        fail_with: Option<WebhookError>,
    }

    #[async_trait::async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(&self, request: &WebhookRequest) -> Result<(), WebhookError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn resolver() -> Arc<PlaceholderResolver> {
        Arc::new(
            PlaceholderResolver::default()
                .with("HOST", "hooks.example.com")
                .with("TOKEN", "t0k3n"),
        )
    }

    fn notifier(config: WebhookConfig, secrets: StaticSecrets) -> (WebhookNotifier, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let notifier = WebhookNotifier::new(config, resolver(), Arc::new(secrets), transport.clone());
        (notifier, transport)
    }

    fn with_url(url: &str) -> WebhookConfig {
        WebhookConfig {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_url_is_a_config_error_without_network() {
        let (notifier, transport) = notifier(WebhookConfig::default(), StaticSecrets::default());
        match notifier.send("t", "m").await {
            Err(NotifyError::Config(msg)) => assert!(msg.contains("webhook URL not configured")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn falls_back_to_webhook_url_secret() {
        let secrets = StaticSecrets::default().with(WEBHOOK_URL, "https://{{HOST}}/fallback");
        let (notifier, _) = notifier(WebhookConfig::default(), secrets);
        let request = notifier.build_request("t", "m").unwrap();
        assert_eq!(request.url, "https://hooks.example.com/fallback");
    }

    #[test]
    fn defaults_are_applied() {
        let (notifier, _) = notifier(with_url("https://example.com"), StaticSecrets::default());
        let request = notifier.build_request("t", "m").unwrap();
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.max_retries, 0);
        assert_eq!(request.timeout_secs, 30);
        assert!(!request.skip_tls_verify);
        assert_eq!(request.content_type, "application/json");
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["title"], "t");
        assert_eq!(body["Message"], "m");
    }

    #[test]
    fn method_is_case_normalized() {
        let mut config = with_url("https://example.com");
        config.method = Some("put".into());
        let (notifier, _) = notifier(config, StaticSecrets::default());
        assert_eq!(notifier.build_request("t", "m").unwrap().method, reqwest::Method::PUT);
    }

    #[test]
    fn invalid_method_is_rejected() {
        let mut config = with_url("https://example.com");
        config.method = Some("NOT A METHOD".into());
        let (notifier, _) = notifier(config, StaticSecrets::default());
        assert!(matches!(
            notifier.build_request("t", "m"),
            Err(NotifyError::Config(msg)) if msg.contains("invalid HTTP method")
        ));
    }

    #[test]
    fn headers_are_resolved_then_authenticated() {
        let mut config = with_url("https://{{HOST}}/hook");
        config.headers = HashMap::from([
            ("X-Token-Echo".to_string(), "{{TOKEN}}".to_string()),
            ("Authorization".to_string(), "overwritten".to_string()),
        ]);
        config.auth_type = Some("bearer".into());
        config.auth_token = Some("{{TOKEN}}".into());
        config.retries = 2;
        config.timeout = 7;
        config.skip_tls_verify = true;

        let (notifier, _) = notifier(config, StaticSecrets::default());
        let request = notifier.build_request("t", "m").unwrap();
        assert_eq!(request.url, "https://hooks.example.com/hook");
        assert_eq!(request.headers["X-Token-Echo"], "t0k3n");
        assert_eq!(request.headers["Authorization"], "Bearer t0k3n");
        assert_eq!(request.max_retries, 2);
        assert_eq!(request.timeout_secs, 7);
        assert!(request.skip_tls_verify);
    }

    #[test]
    fn auth_wins_over_lowercase_configured_header() {
        let mut config = with_url("https://example.com");
        config.headers = HashMap::from([("authorization".to_string(), "stale".to_string())]);
        config.auth_type = Some("bearer".into());
        config.auth_token = Some("tok".into());

        let (notifier, _) = notifier(config, StaticSecrets::default());
        for _ in 0..20 {
            let request = notifier.build_request("t", "m").unwrap();
            assert_eq!(request.headers.len(), 1);
            assert_eq!(request.headers["Authorization"], "Bearer tok");
        }
    }

    #[test]
    fn text_payload_is_sent_verbatim() {
        let mut config = with_url("https://example.com");
        config.custom_payload = Some(crate::config::CustomPayload {
            template: Some("ALERT {{.Title}}".into()),
            ..Default::default()
        });
        let (notifier, _) = notifier(config, StaticSecrets::default());
        let request = notifier.build_request("disk full", "m").unwrap();
        assert_eq!(request.body, b"ALERT disk full");
        assert_eq!(request.content_type, "text/plain");
    }

    #[tokio::test]
    async fn template_failure_names_the_stage() {
        let mut config = with_url("https://example.com");
        config.custom_payload = Some(crate::config::CustomPayload {
            template: Some("{{.Title +}}".into()),
            ..Default::default()
        });
        let (notifier, transport) = notifier(config, StaticSecrets::default());
        let err = notifier.send("t", "m").await.unwrap_err();
        assert!(err.to_string().starts_with("failed to build webhook payload"), "got: {err}");
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_classification_is_propagated() {
        let transport = Arc::new(MockTransport {
            fail_with: Some(WebhookError::status(503, "maintenance".into(), true)),
            ..Default::default()
        });
        let notifier = WebhookNotifier::new(
            with_url("https://example.com"),
            resolver(),
            Arc::new(StaticSecrets::default()),
            transport.clone(),
        );

        let err = notifier.send("t", "m").await.unwrap_err();
        assert!(err.is_retryable());
        match err {
            NotifyError::Webhook(e) => {
                assert_eq!(e.status_code, Some(503));
                assert_eq!(e.body, "maintenance");
            }
            other => panic!("expected Webhook error, got: {other:?}"),
        }
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn channel_name_is_webhook() {
        let (notifier, _) = notifier(with_url("https://example.com"), StaticSecrets::default());
        assert_eq!(notifier.channel_name(), "webhook");
    }
}
