//! Redaction chokepoint for evidence artifacts.
//!
//! Every value handed to the evidence writer passes through here before a
//! single byte reaches storage.

use regex::Regex;
use serde_json::Value;

/// Canonical replacement marker for redacted content.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Field names whose values are masked wholesale. Matched as
/// case-insensitive substrings of the key.
const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "secret",
    "password",
    "passwd",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "private_key",
    "access_key",
];

/// Redacts sensitive fields and token-like content from structured values.
#[derive(Debug, Clone)]
pub struct Redactor {
    exact_secrets: Vec<String>,
    patterns: Vec<Regex>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Redactor {
    /// Create a redactor that additionally strips the given known secret
    /// values wherever they appear in string content.
    pub fn new(exact_secrets: Vec<String>) -> Self {
        Self {
            exact_secrets,
            patterns: default_patterns(),
        }
    }

    /// Redact a structured value, returning the sanitized copy.
    ///
    /// Objects and arrays are walked recursively. An object entry whose key
    /// looks sensitive has its value replaced by [`REDACTION_MARKER`];
    /// string values elsewhere are scrubbed of registered secrets and
    /// credential-shaped tokens. Idempotent: redacting an already-redacted
    /// value is a no-op.
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, entry)| {
                        if is_sensitive_key(key) {
                            (key.clone(), Value::String(REDACTION_MARKER.to_owned()))
                        } else {
                            (key.clone(), self.redact(entry))
                        }
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.redact(item)).collect())
            }
            Value::String(text) => Value::String(self.redact_text(text)),
            other => other.clone(),
        }
    }

    /// Redact exact known secrets and known secret patterns from text.
    pub fn redact_text(&self, text: &str) -> String {
        let mut sanitized = text.to_owned();
        for secret in &self.exact_secrets {
            if !secret.is_empty() {
                sanitized = sanitized.replace(secret, REDACTION_MARKER);
            }
        }
        for pattern in &self.patterns {
            sanitized = pattern
                .replace_all(&sanitized, REDACTION_MARKER)
                .to_string();
        }
        sanitized
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|marker| lowered.contains(marker))
}

fn default_patterns() -> Vec<Regex> {
    let patterns = [
        r"sk-ant-[A-Za-z0-9_\-]{10,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"ghp_[A-Za-z0-9]{20,}",
        r"glpat-[A-Za-z0-9_\-]{16,}",
        r"xoxb-[A-Za-z0-9\-]{20,}",
    ];

    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}
