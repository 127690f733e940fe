//! Backend Selector
//!
//! Picks the one completion backend a process runs with. The choice is made
//! once at startup from `LLMConfig`; a missing credential for the selected
//! provider is a configuration error and aborts startup.

use super::anthropic::AnthropicProvider;
use super::groq::GroqProvider;
use super::openai::OpenAIProvider;
use super::{CompletionBackend, GenerationParams};
use crate::config::LLMConfig;
use crate::secrets::SecretString;
use sdk::errors::EngineError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Groq (Llama models, OpenAI-compatible API)
    #[default]
    Groq,

    /// OpenAI (GPT models)
    #[serde(rename = "openai")]
    OpenAI,

    /// Anthropic Claude
    #[serde(alias = "anthropic")]
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Groq, ProviderKind::OpenAI, ProviderKind::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Claude => "claude",
        }
    }

    /// Environment variable holding this provider's credential
    pub fn credential_env_var(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAI),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(EngineError::Config(format!(
                "Unknown AI provider '{}'. Must be one of: groq, openai, claude",
                other
            ))),
        }
    }
}

/// The active provider and its credential
#[derive(Debug, Clone)]
pub struct BackendConfiguration {
    pub provider: ProviderKind,
    pub credential: SecretString,
}

impl BackendConfiguration {
    /// Resolve the active provider's credential from `config`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` when the credential is absent or blank.
    pub fn from_config(config: &LLMConfig) -> Result<Self, EngineError> {
        let provider = config.provider;
        match config.active_credential() {
            Some(credential) if !credential.is_blank() => Ok(Self {
                provider,
                credential: credential.clone(),
            }),
            _ => Err(EngineError::Config(format!(
                "{} is required when AI_PROVIDER is '{}'",
                provider.credential_env_var(),
                provider
            ))),
        }
    }
}

/// Construct the completion backend selected by `config`.
///
/// # Errors
///
/// Returns `EngineError::Config` if the selected provider has no credential.
pub fn select_backend(config: &LLMConfig) -> Result<Arc<dyn CompletionBackend>, EngineError> {
    let BackendConfiguration {
        provider,
        credential,
    } = BackendConfiguration::from_config(config)?;

    let params = GenerationParams {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let backend: Arc<dyn CompletionBackend> = match provider {
        ProviderKind::Groq => Arc::new(GroqProvider::new(&config.groq, credential, params)),
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(&config.openai, credential, params)),
        ProviderKind::Claude => Arc::new(AnthropicProvider::new(
            config.anthropic.clone(),
            credential,
            params,
        )),
    };

    tracing::info!(
        provider = backend.name(),
        model = backend.model(),
        "Completion backend initialized"
    );

    Ok(backend)
}
