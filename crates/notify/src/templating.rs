//! Minijinja rendering for structural webhook templates.
//!
//! A structural template mixes two placeholder syntaxes:
//!
//! - `{{NAME}}`: a domain placeholder, expanded by the
//!   [`ParameterResolver`] before rendering.
//! - `{{.Title}}`: a template reference, evaluated by minijinja against
//!   the payload data context (`{{.Title | upper}}` and trim markers like
//!   `{{- .Title -}}` are accepted as well).
//!
//! The template is split into tagged segments before anything is
//! substituted. Literal text and resolved placeholder values enter the
//! minijinja context as data, so neither is parsed as template syntax:
//! `{%` and `{#` in a JSON string stay literal. Only references reach
//! minijinja as expressions. Trim markers are applied to the adjacent
//! literal text before rendering.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use serde_json::{Map, Value};

use crate::params::ParameterResolver;
use crate::payload::PayloadError;

/// Context key prefix for literal text and resolved placeholder values.
const PARAM_KEY_PREFIX: &str = "__signalpost_param_";

/// One lexical piece of a structural template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any `{{...}}` span.
    Literal(&'a str),
    /// A domain placeholder body, trimmed (`SITE` for `{{ SITE }}`).
    Placeholder(&'a str),
    /// A template reference, without its leading dot.
    Reference {
        expr: &'a str,
        trim_left: bool,
        trim_right: bool,
    },
}

/// A structural template split into [`Segment`]s.
#[derive(Debug, Clone)]
pub struct StructuralTemplate<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> StructuralTemplate<'a> {
    /// Split `source` into literal text, placeholders and references.
    ///
    /// An unterminated `{{` and an empty `{{}}` are literal text.
    pub fn parse(source: &'a str) -> Self {
        let mut segments = Vec::new();
        let mut pos = 0;

        while let Some(offset) = source[pos..].find("{{") {
            let open = pos + offset;
            if open > pos {
                segments.push(Segment::Literal(&source[pos..open]));
            }

            let Some(len) = source[open + 2..].find("}}") else {
                segments.push(Segment::Literal(&source[open..]));
                pos = source.len();
                break;
            };
            let close = open + 2 + len;
            let segment = classify_span(&source[open + 2..close])
                .unwrap_or(Segment::Literal(&source[open..close + 2]));
            segments.push(segment);
            pos = close + 2;
        }

        if pos < source.len() {
            segments.push(Segment::Literal(&source[pos..]));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Whether the template references `name` directly (`{{.Title}}`).
    pub fn references(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Reference { expr, .. } if *expr == name))
    }

    /// Expand placeholders through `resolver`, then render the template
    /// references against `data`.
    ///
    /// # Errors
    ///
    /// [`PayloadError::TemplateParse`] when the translated template does
    /// not compile, [`PayloadError::TemplateExecute`] when rendering fails.
    pub fn render(
        &self,
        data: &Map<String, Value>,
        resolver: &dyn ParameterResolver,
    ) -> Result<String, PayloadError> {
        let mut context = data.clone();
        let mut source = String::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    let text = self.trimmed_literal(index, text);
                    if !text.is_empty() {
                        push_data(&mut source, &mut context, index, text.to_string());
                    }
                }
                Segment::Placeholder(name) => {
                    let value = resolver.resolve(&format!("{{{{{name}}}}}"));
                    push_data(&mut source, &mut context, index, value);
                }
                Segment::Reference { expr, .. } if expr.is_empty() => {
                    return Err(PayloadError::TemplateParse(
                        "`{{.}}` names no field; reference one such as `{{.Title}}`".to_string(),
                    ));
                }
                Segment::Reference { expr, .. } => {
                    source.push_str("{{ ");
                    source.push_str(expr);
                    source.push_str(" }}");
                }
            }
        }

        TemplateRenderer::new().render(&source, &context)
    }

    /// Literal text at `index`, with whitespace removed next to a
    /// reference carrying a trim marker on that side.
    fn trimmed_literal<'t>(&self, index: usize, text: &'t str) -> &'t str {
        const WHITESPACE: [char; 4] = [' ', '\t', '\r', '\n'];

        let mut text = text;
        let before = index.checked_sub(1).and_then(|i| self.segments.get(i));
        if matches!(before, Some(Segment::Reference { trim_right: true, .. })) {
            text = text.trim_start_matches(WHITESPACE);
        }
        if matches!(
            self.segments.get(index + 1),
            Some(Segment::Reference { trim_left: true, .. })
        ) {
            text = text.trim_end_matches(WHITESPACE);
        }
        text
    }
}

/// Emit `value` as a context variable so minijinja prints it verbatim.
fn push_data(source: &mut String, context: &mut Map<String, Value>, index: usize, value: String) {
    let key = format!("{PARAM_KEY_PREFIX}{index}");
    source.push_str("{{ ");
    source.push_str(&key);
    source.push_str(" }}");
    context.insert(key, Value::String(value));
}

/// Tag a span body. Returns `None` for an empty span.
fn classify_span(inner: &str) -> Option<Segment<'_>> {
    let mut body = inner;
    let trim_left = body.starts_with('-');
    if trim_left {
        body = &body[1..];
    }
    let trim_right = body.ends_with('-') && body.len() > 1;
    if trim_right {
        body = &body[..body.len() - 1];
    }

    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match body.strip_prefix('.') {
        Some(expr) => Some(Segment::Reference {
            expr: expr.trim(),
            trim_left,
            trim_right,
        }),
        // Trim markers only mean something to the template engine.
        None => Some(Segment::Placeholder(inner.trim())),
    }
}

/// Renders translated templates with minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env<'source>() -> minijinja::Environment<'source> {
        let mut env = minijinja::Environment::new();
        // Rendered output becomes a request body; keep it byte-for-byte.
        env.set_keep_trailing_newline(true);
        env
    }

    /// Compile and render `source` against `context`.
    pub fn render(&self, source: &str, context: &Map<String, Value>) -> Result<String, PayloadError> {
        let env = Self::build_env();
        let template = env
            .template_from_str(source)
            .map_err(|e| PayloadError::TemplateParse(e.to_string()))?;
        template
            .render(context)
            .map_err(|e| PayloadError::TemplateExecute(e.to_string()))
    }
}
