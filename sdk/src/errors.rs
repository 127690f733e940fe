//! Error types and handling
//!
//! This module provides the error types shared across the relay workspace.
//! All errors implement the `RelayErrorExt` trait which provides operator-facing
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never carry credentials, tokens, or the
//! text of an upstream response, so they are safe to print anywhere.

use thiserror::Error;

/// Trait for relay error extensions
///
/// This trait provides additional context for errors, including short hints
/// and recoverability information. All engine errors implement this trait.
pub trait RelayErrorExt {
    /// Returns a short hint for the error
    ///
    /// The hint is safe to display and does not contain:
    /// - Secrets (API keys, access tokens, app secrets)
    /// - Message content
    /// - Upstream response bodies
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are scoped to a single request and can be retried.
    /// Non-recoverable errors abort startup and require operator action.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid or missing settings, missing provider credential
/// - **Validation**: malformed inbound message (ignored, never sent back)
/// - **Network**: outbound delivery failures
/// - **Serialization**: payload encoding/decoding failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, RelayErrorExt};
///
/// let error = EngineError::Validation("non-text message".to_string());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("GROQ_API_KEY is required".to_string());
/// assert!(!fatal.is_recoverable());
/// println!("Hint: {}", fatal.user_hint());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Inbound message validation errors
    #[error("Invalid inbound message: {0}")]
    Validation(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check config.toml and the AI_PROVIDER / *_API_KEY environment",
            Self::Validation(_) => "Inbound message was ignored",
            Self::Network(_) => "Messaging API request failed. Check the access token and network",
            Self::Serialization(_) => "Payload could not be encoded or decoded",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
