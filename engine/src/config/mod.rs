//! Configuration management
//!
//! This module handles loading, validation, and environment overrides of the
//! relay configuration. Configuration is stored in TOML format, by default at
//! ~/.relay/config.toml; every section is optional and falls back to defaults.
//!
//! # Configuration Sections
//!
//! - **core**: log level, debug flag
//! - **server**: webhook listener address
//! - **whatsapp**: Graph API base URL, phone number id, tokens
//! - **llm**: active provider, timeout, generation parameters, per-provider settings
//! - **conversation**: history window per sender
//!
//! # Environment Overrides
//!
//! Environment variables take precedence over the file. The names match the
//! usual deployment `.env` (`AI_PROVIDER`, `GROQ_API_KEY`, `WHATSAPP_TOKEN`, ...).
//! Credentials can live in either place; keeping them in the environment is
//! recommended.
//!
//! # Examples
//!
//! ```no_run
//! use relay_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! println!("Provider: {}", config.llm.provider);
//! println!("History window: {}", config.conversation.max_history);
//! # Ok(())
//! # }
//! ```

use crate::llm::ProviderKind;
use crate::secrets::{secret_from_env, SecretString};
use sdk::errors::EngineError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// Webhook server settings
    pub server: ServerConfig,

    /// WhatsApp Business API settings
    pub whatsapp: WhatsAppConfig,

    /// Completion backend settings
    pub llm: LLMConfig,

    /// Conversation history settings
    pub conversation: ConversationConfig,
}

/// Core configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable debug mode (reported on /health)
    #[serde(default)]
    pub debug: bool,
}

/// Webhook server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

/// WhatsApp Business API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API base URL (including version)
    #[serde(default = "default_whatsapp_api_base_url")]
    pub api_base_url: String,

    /// Business phone number id messages are sent from
    #[serde(default)]
    pub phone_number_id: String,

    /// Access token from the Meta developer portal
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Token Meta echoes back during the webhook subscription handshake
    #[serde(default)]
    pub verify_token: Option<SecretString>,

    /// App secret for `X-Hub-Signature-256` verification (optional)
    #[serde(default)]
    pub app_secret: Option<SecretString>,
}

/// Completion backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// Active provider (groq, openai, claude)
    #[serde(default)]
    pub provider: ProviderKind,

    /// Upper bound for a single backend call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum reply length in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Groq provider settings
    #[serde(default)]
    pub groq: GroqConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Anthropic provider settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// Groq provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GroqConfig {
    /// Base URL for the Groq OpenAI-compatible API
    #[serde(default = "default_groq_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_groq_model")]
    pub model: String,

    /// API key (prefer GROQ_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key (prefer OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    /// Base URL for Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// API key (prefer ANTHROPIC_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// Conversation history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Maximum turns kept per sender (two per exchange)
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_whatsapp_api_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_history() -> usize {
    10
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            debug: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_whatsapp_api_base_url(),
            phone_number_id: String::new(),
            access_token: None,
            verify_token: None,
            app_secret: None,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            groq: GroqConfig::default(),
            openai: OpenAIConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: default_groq_base_url(),
            model: default_groq_model(),
            api_key: None,
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key: None,
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            api_key: None,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

impl LLMConfig {
    /// Upper bound for a single backend call
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Model configured for the active provider
    pub fn active_model(&self) -> &str {
        match self.provider {
            ProviderKind::Groq => &self.groq.model,
            ProviderKind::OpenAI => &self.openai.model,
            ProviderKind::Claude => &self.anthropic.model,
        }
    }

    /// Credential configured for the active provider, if any
    pub fn active_credential(&self) -> Option<&SecretString> {
        match self.provider {
            ProviderKind::Groq => self.groq.api_key.as_ref(),
            ProviderKind::OpenAI => self.openai.api_key.as_ref(),
            ProviderKind::Claude => self.anthropic.api_key.as_ref(),
        }
    }
}

impl WhatsAppConfig {
    /// Validate the settings the webhook server needs.
    ///
    /// Only checked when the server starts; the terminal chat runs without them.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` naming the first missing setting.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.phone_number_id.trim().is_empty() {
            return Err(EngineError::Config(
                "WHATSAPP_PHONE_NUMBER_ID is required to run the webhook server".to_string(),
            ));
        }
        if self.access_token.as_ref().map_or(true, SecretString::is_blank) {
            return Err(EngineError::Config(
                "WHATSAPP_TOKEN is required to run the webhook server".to_string(),
            ));
        }
        if self.verify_token.as_ref().map_or(true, SecretString::is_blank) {
            return Err(EngineError::Config(
                "WHATSAPP_VERIFY_TOKEN is required to run the webhook server".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. The default path is optional: when it is
    /// missing, built-in defaults are used. Environment overrides are applied
    /// afterwards, then the result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicit configuration file cannot be read
    /// - TOML parsing fails
    /// - An environment override cannot be parsed
    /// - Validation fails
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading overrides through `lookup`.
    pub fn load_with_env(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EngineError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => Self::read_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides(lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string without env overrides.
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    fn read_file(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Default configuration file path (~/.relay/config.toml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".relay").join("config.toml"))
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// `lookup` is injected so tests never touch the process environment.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` when a numeric or enumerated value
    /// cannot be parsed.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), EngineError> {
        if let Some(provider) = lookup("AI_PROVIDER") {
            self.llm.provider = ProviderKind::from_str(&provider)?;
        }
        if let Some(key) = secret_from_env(&lookup, "GROQ_API_KEY") {
            self.llm.groq.api_key = Some(key);
        }
        if let Some(key) = secret_from_env(&lookup, "OPENAI_API_KEY") {
            self.llm.openai.api_key = Some(key);
        }
        if let Some(key) = secret_from_env(&lookup, "ANTHROPIC_API_KEY") {
            self.llm.anthropic.api_key = Some(key);
        }
        if let Some(timeout) = lookup("AI_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("AI_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(token) = secret_from_env(&lookup, "WHATSAPP_TOKEN") {
            self.whatsapp.access_token = Some(token);
        }
        if let Some(token) = secret_from_env(&lookup, "WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = Some(token);
        }
        if let Some(secret) = secret_from_env(&lookup, "WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = Some(secret);
        }
        if let Some(id) = lookup("WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = id;
        }
        if let Some(url) = lookup("WHATSAPP_API_BASE_URL") {
            self.whatsapp.api_base_url = url;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.core.log_level = level.to_lowercase();
        }
        if let Some(debug) = lookup("DEBUG") {
            self.core.debug = parse_env("DEBUG", &debug.to_lowercase())?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(max_history) = lookup("MAX_HISTORY") {
            self.conversation.max_history = parse_env("MAX_HISTORY", &max_history)?;
        }

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Provider credentials are not checked here; that happens when the
    /// backend is constructed (see `llm::select_backend`).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        // The window must hold whole (user, assistant) pairs so that
        // truncation never leaves an assistant turn at the front.
        let max_history = self.conversation.max_history;
        if max_history < 2 || max_history % 2 != 0 {
            return Err(EngineError::Config(format!(
                "max_history must be an even number >= 2, got {}",
                max_history
            )));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, EngineError> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Config(format!("Invalid value for {}: '{}'", key, value)))
}
