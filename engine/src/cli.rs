//! CLI interface for Relay
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sender id used by the terminal chat when none is given
pub const DEFAULT_CHAT_SENDER: &str = "+1234567890";

/// Relay WhatsApp AI Chatbot
///
/// Answers WhatsApp Business messages with a configurable AI provider
/// (Groq, OpenAI or Anthropic Claude), keeping a short history per sender.
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the WhatsApp webhook server
    Serve,

    /// Chat with the configured provider from the terminal
    Chat {
        /// Sender id the conversation is stored under
        #[arg(long, default_value = DEFAULT_CHAT_SENDER)]
        sender: String,
    },

    /// Validate configuration and show the effective settings
    Check,
}
