//! Webhook payload construction.
//!
//! Turns a title and message into a request body plus content type,
//! using either the default JSON payload or the channel's
//! [`CustomPayload`] description.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::config::CustomPayload;
use crate::params::ParameterResolver;
use crate::templating::StructuralTemplate;

pub const SERVICE_NAME: &str = "signalpost";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Base context keys that a rendered JSON object does not inherit.
const RESERVED_KEYS: [&str; 6] = ["title", "message", "Title", "Message", "timestamp", "service"];

/// Keys left out of the synthesized fallback object.
const ALERT_KEYS: [&str; 4] = ["title", "message", "Title", "Message"];

/// Failures while building a payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("failed to parse template: {0}")]
    TemplateParse(String),

    #[error("failed to execute template: {0}")]
    TemplateExecute(String),
}

/// A per-send request body, not yet serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    /// Sent verbatim.
    Text(String),
    /// JSON-encoded before sending.
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPayload {
    pub body: PayloadBody,
    pub content_type: String,
}

impl ResolvedPayload {
    fn json(value: Value, content_type: &str) -> Self {
        Self {
            body: PayloadBody::Json(value),
            content_type: content_type.to_string(),
        }
    }

    /// Serialize the body: text verbatim, everything else as JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.body {
            PayloadBody::Text(text) => Ok(text.as_bytes().to_vec()),
            PayloadBody::Json(value) => serde_json::to_vec(value),
        }
    }
}

/// Build the body for one notification.
///
/// `title` and `message` are expanded through `resolver` first. Without a
/// custom payload the base data context is sent as JSON.
pub fn build_payload(
    title: &str,
    message: &str,
    custom: Option<&CustomPayload>,
    resolver: &dyn ParameterResolver,
) -> Result<ResolvedPayload, PayloadError> {
    let data = base_context(&resolver.resolve(title), &resolver.resolve(message));

    match custom {
        Some(custom) => build_custom_payload(data, custom, resolver),
        None => Ok(ResolvedPayload::json(Value::Object(data), CONTENT_TYPE_JSON)),
    }
}

/// `title`/`message` plus capitalized aliases for template references,
/// a UTC timestamp and the service tag.
fn base_context(title: &str, message: &str) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("title".into(), Value::from(title));
    data.insert("message".into(), Value::from(message));
    data.insert("Title".into(), Value::from(title));
    data.insert("Message".into(), Value::from(message));
    data.insert(
        "timestamp".into(),
        Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    data.insert("service".into(), Value::from(SERVICE_NAME));
    data
}

fn build_custom_payload(
    data: Map<String, Value>,
    custom: &CustomPayload,
    resolver: &dyn ParameterResolver,
) -> Result<ResolvedPayload, PayloadError> {
    let mut enhanced = data.clone();

    for (key, value) in &custom.fields {
        enhanced.insert(key.clone(), Value::from(resolver.resolve(value)));
    }

    let remaps = [
        (&custom.title_field, custom.include_title, "title"),
        (&custom.message_field, custom.include_message, "message"),
    ];
    for (field, include, source) in remaps {
        if let (Some(field), true) = (field.as_deref().filter(|f| !f.is_empty()), include) {
            enhanced.insert(field.to_string(), data.get(source).cloned().unwrap_or_default());
        }
    }

    let content_type = custom.content_type.as_deref().filter(|c| !c.is_empty());

    match custom.template.as_deref().filter(|t| !t.is_empty()) {
        Some(template) => render_template_payload(template, enhanced, content_type, resolver),
        None => Ok(ResolvedPayload::json(
            Value::Object(enhanced),
            content_type.unwrap_or(CONTENT_TYPE_JSON),
        )),
    }
}

fn render_template_payload(
    template: &str,
    data: Map<String, Value>,
    content_type: Option<&str>,
    resolver: &dyn ParameterResolver,
) -> Result<ResolvedPayload, PayloadError> {
    let template = StructuralTemplate::parse(template);
    let rendered = template.render(&data, resolver)?;
    let json_type = content_type.unwrap_or(CONTENT_TYPE_JSON);

    match serde_json::from_str::<Value>(&rendered) {
        Ok(Value::Object(mut object)) => {
            for (key, value) in data {
                if !RESERVED_KEYS.contains(&key.as_str()) && !object.contains_key(&key) {
                    object.insert(key, value);
                }
            }
            Ok(ResolvedPayload::json(Value::Object(object), json_type))
        }
        Ok(other) => Ok(ResolvedPayload::json(other, json_type)),
        Err(_) if template.references("Title") && template.references("Message") => {
            // Usually an unescaped quote in the title or message; recover
            // the intended structure instead of failing the delivery.
            let mut object = Map::new();
            object.insert("alert".into(), data.get("Title").cloned().unwrap_or_default());
            object.insert("details".into(), data.get("Message").cloned().unwrap_or_default());
            for (key, value) in data {
                if !ALERT_KEYS.contains(&key.as_str()) {
                    object.insert(key, value);
                }
            }
            Ok(ResolvedPayload::json(Value::Object(object), json_type))
        }
        Err(_) => Ok(ResolvedPayload {
            body: PayloadBody::Text(rendered),
            content_type: content_type.unwrap_or(CONTENT_TYPE_TEXT).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PlaceholderResolver;

    fn resolver() -> PlaceholderResolver {
        PlaceholderResolver::default()
            .with("SITE", "example.org")
            .with("STATUS", "down")
    }

    fn object(payload: &ResolvedPayload) -> &Map<String, Value> {
        match &payload.body {
            PayloadBody::Json(Value::Object(map)) => map,
            other => panic!("expected JSON object, got: {other:?}"),
        }
    }

    fn with_template(template: &str) -> CustomPayload {
        CustomPayload {
            template: Some(template.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn default_payload_carries_both_key_cases() {
        let payload = build_payload("T", "M", None, &resolver()).unwrap();
        assert_eq!(payload.content_type, "application/json");
        let map = object(&payload);
        assert_eq!(map["title"], "T");
        assert_eq!(map["message"], "M");
        assert_eq!(map["Title"], "T");
        assert_eq!(map["Message"], "M");
        assert_eq!(map["service"], "signalpost");
        let ts = map["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "got: {ts}");
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn title_and_message_are_resolved() {
        let payload = build_payload("{{SITE}} is {{STATUS}}", "check {{SITE}}", None, &resolver()).unwrap();
        let map = object(&payload);
        assert_eq!(map["title"], "example.org is down");
        assert_eq!(map["Message"], "check example.org");
    }

    #[test]
    fn fields_and_remapping_without_template() {
        let custom = CustomPayload {
            fields: [("site".to_string(), "{{SITE}}".to_string()), ("team".to_string(), "ops".to_string())]
                .into_iter()
                .collect(),
            title_field: Some("alert".into()),
            include_title: true,
            message_field: Some("details".into()),
            include_message: false,
            ..Default::default()
        };
        let payload = build_payload("T", "M", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.content_type, "application/json");
        let map = object(&payload);
        assert_eq!(map["site"], "example.org");
        assert_eq!(map["team"], "ops");
        assert_eq!(map["alert"], "T");
        assert!(!map.contains_key("details"));
        assert_eq!(map["title"], "T");
    }

    #[test]
    fn custom_content_type_without_template() {
        let custom = CustomPayload {
            content_type: Some("application/vnd.alert+json".into()),
            ..Default::default()
        };
        let payload = build_payload("T", "M", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.content_type, "application/vnd.alert+json");
    }

    #[test]
    fn template_object_keeps_explicit_values_and_merges_custom_fields() {
        let mut custom = with_template(r#"{"text": "{{.Title}} @ {{SITE}}", "team": "fixed"}"#);
        custom.fields.insert("team".into(), "ops".into());
        custom.fields.insert("region".into(), "eu".into());

        let payload = build_payload("Down", "no answer", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.content_type, "application/json");
        let map = object(&payload);
        assert_eq!(map["text"], "Down @ example.org");
        assert_eq!(map["team"], "fixed");
        assert_eq!(map["region"], "eu");
        for reserved in RESERVED_KEYS {
            assert!(!map.contains_key(reserved), "unexpected key {reserved}");
        }
    }

    #[test]
    fn template_non_object_json_is_returned_as_is() {
        let custom = with_template(r#"["{{.Title}}", "{{.Message}}"]"#);
        let payload = build_payload("a", "b", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.body, PayloadBody::Json(serde_json::json!(["a", "b"])));
        assert_eq!(payload.content_type, "application/json");
    }

    #[test]
    fn broken_json_with_title_and_message_is_recovered() {
        let custom = with_template(r#"{"text": "{{.Title}}", "body": "{{.Message}}"}"#);
        let payload = build_payload(r#"say "hi""#, "M", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.content_type, "application/json");
        let map = object(&payload);
        assert_eq!(map["alert"], r#"say "hi""#);
        assert_eq!(map["details"], "M");
        assert_eq!(map["service"], "signalpost");
        assert!(map.contains_key("timestamp"));
        assert!(!map.contains_key("Title"));
        assert!(!map.contains_key("message"));
    }

    #[test]
    fn plain_text_template_falls_back_to_text() {
        let custom = with_template("[{{SITE}}] {{.Title}}");
        let payload = build_payload("Down", "M", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.body, PayloadBody::Text("[example.org] Down".into()));
        assert_eq!(payload.content_type, "text/plain");
    }

    #[test]
    fn text_template_honors_content_type_override() {
        let mut custom = with_template("*{{.Title}}*");
        custom.content_type = Some("text/markdown".into());
        let payload = build_payload("Down", "M", Some(&custom), &resolver()).unwrap();
        assert_eq!(payload.content_type, "text/markdown");
    }

    #[test]
    fn template_error_is_reported() {
        let custom = with_template("{{.Title +}}");
        let result = build_payload("T", "M", Some(&custom), &resolver());
        assert!(matches!(result, Err(PayloadError::TemplateParse(_))));
    }

    #[test]
    fn jinja_delimiters_in_json_strings_are_plain_text() {
        let custom = with_template(r#"{"text": "{{.Title}}", "tag": "{#ops", "fmt": "{%d}"}"#);
        let payload = build_payload("Down", "M", Some(&custom), &resolver()).unwrap();
        let body = object(&payload);
        assert_eq!(body["text"], "Down");
        assert_eq!(body["tag"], "{#ops");
        assert_eq!(body["fmt"], "{%d}");
    }

    #[test]
    fn text_body_serializes_verbatim() {
        let payload = ResolvedPayload {
            body: PayloadBody::Text("raw {not json".into()),
            content_type: CONTENT_TYPE_TEXT.into(),
        };
        assert_eq!(payload.to_bytes().unwrap(), b"raw {not json");
    }
}
