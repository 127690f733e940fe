//! WhatsApp Business transport
//!
//! Inbound: webhook payload types, subscription handshake, signature check and
//! extraction of text messages. Outbound: the Cloud API client.

use async_trait::async_trait;
use sdk::errors::EngineError;

pub mod client;
pub mod types;
pub mod webhook;

pub use client::WhatsAppClient;
pub use webhook::{
    group_by_sender, inbound_messages, verify_signature, verify_subscription, InboundMessage,
};

/// Where replies are delivered
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Send a text message to `to`
    async fn send_text(&self, to: &str, body: &str) -> Result<(), EngineError>;

    /// Mark an inbound message as read
    async fn mark_as_read(&self, message_id: &str) -> Result<(), EngineError>;
}
