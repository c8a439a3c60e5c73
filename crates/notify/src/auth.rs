//! Webhook authentication headers.

use std::collections::HashMap;

use base64::Engine as _;

use crate::config::WebhookConfig;
use crate::params::ParameterResolver;

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Add the authentication header implied by `config.auth_type`.
///
/// Credential values pass through `resolver`, so secrets may be written
/// as placeholders. The auth header replaces a configured header of the
/// same name in any letter case. Unknown kinds and missing credentials
/// leave `headers` untouched.
pub fn apply_auth(
    headers: &mut HashMap<String, String>,
    config: &WebhookConfig,
    resolver: &dyn ParameterResolver,
) {
    let Some(kind) = config.auth_type.as_deref() else {
        return;
    };
    let token = non_empty(&config.auth_token);

    match kind.to_lowercase().as_str() {
        "bearer" => {
            if let Some(token) = token {
                set_header(
                    headers,
                    "Authorization".to_string(),
                    format!("Bearer {}", resolver.resolve(token)),
                );
            }
        }
        "basic" => {
            if let (Some(user), Some(pass)) =
                (non_empty(&config.auth_username), non_empty(&config.auth_password))
            {
                let credentials = format!("{}:{}", resolver.resolve(user), resolver.resolve(pass));
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                set_header(headers, "Authorization".to_string(), format!("Basic {encoded}"));
            }
        }
        "apikey" => {
            if let Some(token) = token {
                let header = non_empty(&config.auth_header)
                    .map(|h| resolver.resolve(h))
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
                set_header(headers, header, resolver.resolve(token));
            }
        }
        _ => {}
    }
}

/// Insert `name`, replacing any configured header that differs only in case.
fn set_header(headers: &mut HashMap<String, String>, name: String, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
