//! Secret and environment lookup.
//!
//! Notifiers receive a [`SecretProvider`] at construction instead of
//! reading the process environment directly.

use std::collections::HashMap;

pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const WEBHOOK_URL: &str = "WEBHOOK_URL";

pub trait SecretProvider: Send + Sync {
    /// Look up a value by key. Absent and empty values both yield `None`.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment at lookup time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.is_empty())
    }
}

/// Fixed table of values.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|s| !s.is_empty()).cloned()
    }
}
