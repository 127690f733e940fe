//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from a file,
//! merged with environment overrides, and validated.

use relay_engine::config::Config;
use relay_engine::llm::ProviderKind;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn no_env(_: &str) -> Option<String> {
    None
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
[core]
log_level = "debug"
debug = true

[server]
host = "127.0.0.1"
port = 8080

[whatsapp]
phone_number_id = "1234567890"
access_token = "EAAtoken"
verify_token = "verify-me"

[llm]
provider = "anthropic"
timeout_secs = 15
temperature = 0.2
max_tokens = 512

[llm.anthropic]
model = "claude-3-5-haiku-latest"
api_key = "sk-ant-test"

[conversation]
max_history = 20
"#,
    );

    let config = Config::load_with_env(Some(file.path()), no_env).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert!(config.core.debug);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.llm.provider, ProviderKind::Claude);
    assert_eq!(config.llm.timeout_secs, 15);
    assert_eq!(config.llm.active_model(), "claude-3-5-haiku-latest");
    assert_eq!(
        config.llm.active_credential().map(|s| s.unsecure()),
        Some("sk-ant-test")
    );
    assert_eq!(config.conversation.max_history, 20);
    assert!(config.whatsapp.validate().is_ok());
}

#[test]
fn test_env_overrides_file_values() {
    let file = write_config(
        r#"
[llm]
provider = "groq"

[server]
port = 8080
"#,
    );

    let env: HashMap<&str, &str> = [
        ("AI_PROVIDER", "openai"),
        ("OPENAI_API_KEY", "sk-from-env"),
        ("PORT", "9001"),
        ("WHATSAPP_PHONE_NUMBER_ID", "555"),
    ]
    .into_iter()
    .collect();

    let config = Config::load_with_env(Some(file.path()), |key| {
        env.get(key).map(|v| v.to_string())
    })
    .unwrap();

    assert_eq!(config.llm.provider, ProviderKind::OpenAI);
    assert_eq!(
        config.llm.active_credential().map(|s| s.unsecure()),
        Some("sk-from-env")
    );
    assert_eq!(config.server.port, 9001);
    assert_eq!(config.whatsapp.phone_number_id, "555");
}

#[test]
fn test_invalid_values_rejected_at_load() {
    let odd_history = write_config("[conversation]\nmax_history = 9\n");
    assert!(matches!(
        Config::load_with_env(Some(odd_history.path()), no_env),
        Err(EngineError::Config(_))
    ));

    let bad_provider = write_config("[llm]\nprovider = \"gemini\"\n");
    assert!(Config::load_with_env(Some(bad_provider.path()), no_env).is_err());

    let not_toml = write_config("this is = = not toml");
    assert!(Config::load_with_env(Some(not_toml.path()), no_env).is_err());
}

#[test]
fn test_missing_explicit_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        Config::load_with_env(Some(&missing), no_env),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_secrets_redacted_in_debug_output() {
    let file = write_config("[llm.groq]\napi_key = \"gsk_supersecretvalue\"\n");
    let config = Config::load_with_env(Some(file.path()), no_env).unwrap();

    let debug = format!("{:?}", config);
    assert!(!debug.contains("supersecret"));
    assert!(debug.contains("REDACTED"));
}
