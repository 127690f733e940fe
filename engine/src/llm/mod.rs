//! Completion Backend Abstraction Layer
//!
//! This module provides a common interface over the supported AI completion
//! providers (Groq, OpenAI, Anthropic Claude). The `CompletionBackend` trait
//! defines the single operation every provider implements, so the orchestrator
//! and the conversation store never see provider-specific wire formats.
//!
//! Providers differ only in:
//! - how history turns are serialized into the request,
//! - whether the persona instruction travels in-band (first `system` message,
//!   chat-completions family) or out-of-band (top-level `system` field, Claude),
//! - how the reply text is extracted from the response.

use async_trait::async_trait;
use reqwest::StatusCode;
use sdk::types::ConversationTurn;
use std::fmt;

use crate::secrets::scrub_secrets;

pub mod anthropic;
pub mod groq;
pub mod openai;
pub mod selector;

pub use selector::{select_backend, BackendConfiguration, ProviderKind};

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Fixed persona instruction shared by every provider.
pub const PERSONA_PROMPT: &str = "You are a helpful AI assistant integrated with WhatsApp Business.
You can communicate in multiple languages - automatically detect and respond in the user's language.

Key behaviors:
- Be friendly, professional, and concise
- Respond in the same language the user writes in
- If you don't understand something, politely ask for clarification
- Keep responses brief and relevant for messaging context
- Be helpful and informative

You are here to assist with general questions and conversations.";

/// Errors that can occur during a backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Payload-free discriminant of `BackendError`, used as a log field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Auth,
    RateLimited,
    Unavailable,
    MalformedResponse,
}

impl BackendError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::Auth(_) => BackendErrorKind::Auth,
            BackendError::RateLimited => BackendErrorKind::RateLimited,
            BackendError::Unavailable(_) => BackendErrorKind::Unavailable,
            BackendError::MalformedResponse(_) => BackendErrorKind::MalformedResponse,
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::Auth => write!(f, "auth"),
            BackendErrorKind::RateLimited => write!(f, "rate_limited"),
            BackendErrorKind::Unavailable => write!(f, "unavailable"),
            BackendErrorKind::MalformedResponse => write!(f, "malformed_response"),
        }
    }
}

/// Sampling parameters shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Completion backend trait that all providers must implement
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the provider identifier ("groq", "openai", "claude")
    fn name(&self) -> &str;

    /// Returns the model the provider is configured with
    fn model(&self) -> &str;

    /// Generate a reply to `user_message` given the prior turns
    ///
    /// # Arguments
    /// * `user_message` - The current message from the user
    /// * `history` - Prior turns, oldest first; does not include `user_message`
    ///
    /// # Returns
    /// * `Ok(String)` - The reply text, unmodified
    /// * `Err(BackendError)` - If the upstream call cannot produce a usable reply
    async fn complete(&self, user_message: &str, history: &[ConversationTurn]) -> Result<String>;
}

/// Map a transport failure (connect, TLS, reset, client timeout).
pub(crate) fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Unavailable(scrub_secrets(&err.to_string()))
}

/// Map a non-success HTTP status and its body.
pub(crate) fn status_error(status: StatusCode, body: &str) -> BackendError {
    let body = scrub_secrets(body);
    match status.as_u16() {
        401 | 403 => BackendError::Auth(body),
        429 => BackendError::RateLimited,
        code => BackendError::Unavailable(format!("HTTP {}: {}", code, body)),
    }
}

/// Send a prepared request and decode the JSON body, mapping failures.
pub(crate) async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value> {
    let response = request.send().await.map_err(transport_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(status_error(status, &text));
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::MalformedResponse(e.to_string()))
}

/// Reject replies that carry no displayable text.
pub(crate) fn non_empty_reply(text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(BackendError::MalformedResponse(
            "Empty reply text".to_string(),
        ))
    } else {
        Ok(text)
    }
}
