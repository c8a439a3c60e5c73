//! Domain placeholder expansion.
//!
//! A [`ParameterResolver`] expands `{{NAME}}` placeholders (site name,
//! status, response time, ...) into literal strings. It is consulted for
//! titles, messages, URLs, header values, credentials and custom fields
//! before anything reaches a transport.

use std::collections::HashMap;

/// Expands domain placeholders into literal text.
///
/// Implementations must be idempotent on input without recognized
/// placeholders and safe to call on arbitrary text.
pub trait ParameterResolver: Send + Sync {
    fn resolve(&self, input: &str) -> String;
}

/// Resolver backed by a fixed table of placeholder values.
///
/// `{{ NAME }}` and `{{NAME}}` are equivalent. Names missing from the
/// table, and unterminated `{{`, are copied through unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderResolver {
    values: HashMap<String, String>,
}

impl PlaceholderResolver {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Add or replace a single placeholder value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ParameterResolver for PlaceholderResolver {
    fn resolve(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let end = start + 2 + len + 2;
            let name = rest[start + 2..end - 2].trim();

            out.push_str(&rest[..start]);
            match self.values.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..end]),
            }
            rest = &rest[end..];
        }

        out.push_str(rest);
        out
    }
}
