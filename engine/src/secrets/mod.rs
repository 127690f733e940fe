pub mod string;

pub use string::SecretString;

use regex::Regex;
use std::sync::OnceLock;

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - Anthropic API keys: sk-ant-...
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,}
/// - Groq API keys: gsk_[a-zA-Z0-9]{20,}
/// - Meta Graph access tokens: EAA[a-zA-Z0-9]{20,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-ant-[a-zA-Z0-9\-_]{20,}",
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"gsk_[a-zA-Z0-9]{20,}",
            r"EAA[a-zA-Z0-9]{20,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`.
///
/// Applied to upstream response bodies before they reach a log line or an
/// error message; provider error payloads sometimes echo the key back.
pub fn scrub_secrets(text: &str) -> String {
    let mut scrubbed = text.to_string();
    for pattern in get_secret_patterns() {
        scrubbed = pattern.replace_all(&scrubbed, "[REDACTED]").into_owned();
    }
    scrubbed
}

/// Read a credential from the environment, treating blank values as absent.
pub fn secret_from_env(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<SecretString> {
    lookup(key)
        .map(SecretString::from)
        .filter(|secret| !secret.is_blank())
}
