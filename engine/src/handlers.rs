//! Command handlers for CLI operations
//!
//! - serve: run the webhook server
//! - chat: interactive terminal chat through the same orchestrator
//! - check: validate configuration and report effective settings

use anyhow::{Context, Result};
use sdk::errors::{EngineError, RelayErrorExt};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::llm::select_backend;
use crate::orchestrator::{MessageOrchestrator, Reply};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Attach the operator hint to an engine error
pub fn with_hint(err: EngineError) -> anyhow::Error {
    let hint = err.user_hint().to_string();
    anyhow::Error::new(err).context(format!("Hint: {}", hint))
}

/// Run the webhook server until shutdown
pub async fn handle_serve(config: &Config) -> Result<()> {
    crate::server::serve(config).await.map_err(with_hint)
}

/// One line of terminal chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Empty,
    Exit,
    Clear,
    Message(&'a str),
}

impl<'a> ChatInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        match line.to_lowercase().as_str() {
            "exit" | "quit" | "q" | "bye" => ChatInput::Exit,
            "clear" | "reset" => ChatInput::Clear,
            _ => ChatInput::Message(line),
        }
    }
}

/// Interactive chat with the configured provider
///
/// Conversation is stored under `sender`, exactly as a WhatsApp sender would be.
pub async fn handle_chat(config: &Config, sender: &str) -> Result<()> {
    let backend = select_backend(&config.llm).map_err(with_hint)?;
    let store = Arc::new(ConversationStore::new(config.conversation.max_history));
    let orchestrator = MessageOrchestrator::new(backend, store).with_timeout(config.llm.timeout());

    println!("Relay - Interactive Terminal Chat");
    println!("============================");
    println!("  Type a message and press Enter to chat");
    println!("  Exit: exit, quit, q, bye or Ctrl-C");
    println!("  Clear history: clear, reset");
    println!(
        "  AI Provider: {} ({})",
        orchestrator.backend_name(),
        orchestrator.backend_model()
    );
    println!("============================");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_count = 0usize;

    loop {
        print!("\nYou: ");
        std::io::stdout().flush().ok();

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };

        // EOF or Ctrl-C
        let Some(line) = line else {
            println!();
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Clear => {
                orchestrator.reset(sender);
                message_count = 0;
                println!("Conversation history cleared.");
            }
            ChatInput::Message(text) => match orchestrator.handle(sender, text).await {
                Some(Reply::Generated(reply)) => {
                    message_count += 1;
                    println!("Bot: {}", reply);
                }
                Some(Reply::Fallback) => {
                    println!("Bot: {}", Reply::Fallback.text());
                    println!("\nPlease check:");
                    println!("  - Is the API key for {} set?", config.llm.provider);
                    println!("  - Is AI_PROVIDER configured correctly?");
                    println!("  - Do you have an internet connection?");
                }
                None => continue,
            },
        }
    }

    println!("Goodbye!");
    println!("Total messages: {}", message_count);
    let history_len = orchestrator.store().read(sender).len();
    if history_len > 0 {
        println!("Conversation history: {} turns", history_len);
    }

    Ok(())
}

/// Validate configuration and print the effective settings
///
/// Credentials are reported only as configured or missing.
pub async fn handle_check(config: &Config, format: OutputFormat) -> Result<()> {
    let mut checks: Vec<(&str, String)> = Vec::new();
    let mut issues = Vec::new();

    checks.push(("Configuration", "Valid".to_string()));
    checks.push(("AI provider", config.llm.provider.to_string()));
    checks.push(("Model", config.llm.active_model().to_string()));
    checks.push(("Timeout", format!("{}s", config.llm.timeout_secs)));
    checks.push(("Max history", config.conversation.max_history.to_string()));
    checks.push((
        "Listen address",
        format!("{}:{}", config.server.host, config.server.port),
    ));

    match select_backend(&config.llm) {
        Ok(_) => checks.push(("Provider credential", "Configured".to_string())),
        Err(e) => {
            checks.push(("Provider credential", "Missing".to_string()));
            issues.push(format!("{} ({})", e, e.user_hint()));
        }
    }

    match config.whatsapp.validate() {
        Ok(()) => checks.push(("WhatsApp", "Configured".to_string())),
        Err(e) => {
            checks.push(("WhatsApp", "Incomplete".to_string()));
            issues.push(format!("{} ({})", e, e.user_hint()));
        }
    }

    let signatures = if config.whatsapp.app_secret.is_some() {
        "Verified"
    } else {
        "Not verified (WHATSAPP_APP_SECRET unset)"
    };
    checks.push(("Webhook signatures", signatures.to_string()));

    match format {
        OutputFormat::Text => {
            println!("Relay Configuration Check");
            println!("============================");
            println!();
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }
            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if !issues.is_empty() {
        anyhow::bail!("{} configuration issue(s) found", issues.len());
    }
    Ok(())
}
