//! HTTP delivery with bounded retries.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::traits::{NotifyError, WebhookError};

/// Longest response body kept in a [`WebhookError`].
const MAX_ERROR_BODY: usize = 1024;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(10);

/// Everything the transport needs for one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: String,
    pub method: reqwest::Method,
    pub body: Vec<u8>,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    /// Extra attempts after the first one, for retryable failures only.
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub skip_tls_verify: bool,
}

/// Performs a webhook request, classifying failures as retryable or fatal.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &WebhookRequest) -> Result<(), WebhookError>;
}

/// [`HttpTransport`] backed by `reqwest`.
///
/// Retryable failures are re-attempted up to `max_retries` times with
/// capped exponential backoff. Requests that skip TLS verification go
/// through a separate client so the verifying one is never weakened.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    insecure_client: reqwest::Client,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build HTTP client: {e}")))?;
        let insecure_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            insecure_client,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        })
    }

    /// Override the delay before the first retry and its upper bound.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.backoff_max)
    }

    async fn attempt(
        &self,
        request: &WebhookRequest,
        headers: &HeaderMap,
    ) -> Result<(), WebhookError> {
        let client = if request.skip_tls_verify {
            &self.insecure_client
        } else {
            &self.client
        };

        let response = client
            .request(request.method.clone(), &request.url)
            .headers(headers.clone())
            .timeout(Duration::from_secs(request.timeout_secs))
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| classify_error(&e, request.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(WebhookError::status(
            status.as_u16(),
            truncate(body, MAX_ERROR_BODY),
            is_retryable_status(status),
        ))
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &WebhookRequest) -> Result<(), WebhookError> {
        let headers = build_headers(&request.content_type, &request.headers)?;
        let mut attempt = 0;

        loop {
            match self.attempt(request, &headers).await {
                Ok(()) => {
                    tracing::debug!(
                        url = %request.url,
                        method = %request.method,
                        attempts = attempt + 1,
                        "webhook notification delivered"
                    );
                    return Ok(());
                }
                Err(err) if err.retryable && attempt < request.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::debug!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_retries = request.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying webhook request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// 5xx, 408 Request Timeout and 429 Too Many Requests are transient.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_error(err: &reqwest::Error, timeout_secs: u64) -> WebhookError {
    if err.is_timeout() {
        return WebhookError::network(
            format!("webhook request timed out after {timeout_secs}s"),
            true,
        );
    }
    // Builder and redirect-policy errors repeat identically on every attempt.
    let retryable = !(err.is_builder() || err.is_redirect());
    WebhookError::network(format!("webhook request failed: {err}"), retryable)
}

/// `Content-Type` first; configured headers replace rather than append.
fn build_headers(
    content_type: &str,
    headers: &HashMap<String, String>,
) -> Result<HeaderMap, WebhookError> {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);
    let value = HeaderValue::from_str(content_type).map_err(|e| {
        WebhookError::network(format!("invalid content type {content_type:?}: {e}"), false)
    })?;
    map.insert(CONTENT_TYPE, value);

    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| WebhookError::network(format!("invalid header name {key:?}: {e}"), false))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| WebhookError::network(format!("invalid value for header {key:?}: {e}"), false))?;
        map.insert(name, value);
    }

    Ok(map)
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
