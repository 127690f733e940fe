//! Relay Engine Library
//!
//! Core of the Relay WhatsApp chatbot. Used by the `relay` binary and by
//! integration tests.

/// Configuration management module
pub mod config;

/// Secret handling and log scrubbing
pub mod secrets;

/// Completion backend abstraction layer
pub mod llm;

/// Per-sender conversation history
pub mod conversation;

/// Message orchestration (history + backend + fallback)
pub mod orchestrator;

/// WhatsApp Business transport
pub mod whatsapp;

/// Webhook HTTP server
pub mod server;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
