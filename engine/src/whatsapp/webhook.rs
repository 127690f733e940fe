//! Webhook verification and message extraction.

use super::types::{WebhookMessage, WebhookPayload};
use hmac::{Hmac, Mac};
use sdk::errors::EngineError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verify a `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw body.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        tracing::warn!("Invalid signature header format (missing sha256= prefix)");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        tracing::warn!("Failed to create HMAC");
        return false;
    };

    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(&computed, &expected.to_ascii_lowercase())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a subscription handshake. Returns the challenge to echo on success.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    let token_matches = match token {
        Some(token) => !expected_token.is_empty() && constant_time_eq(token, expected_token),
        None => false,
    };

    if mode == Some("subscribe") && token_matches {
        challenge
    } else {
        None
    }
}

/// A text message ready for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: String,
    pub sender: String,
    pub text: String,
}

impl TryFrom<&WebhookMessage> for InboundMessage {
    type Error = EngineError;

    fn try_from(message: &WebhookMessage) -> Result<Self, Self::Error> {
        if message.message_type != "text" {
            return Err(EngineError::Validation(format!(
                "Unsupported message type: {}",
                message.message_type
            )));
        }

        let sender = message.from.trim();
        if sender.is_empty() {
            return Err(EngineError::Validation("Message has no sender".to_string()));
        }

        let text = message
            .text
            .as_ref()
            .map(|t| t.body.trim())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(EngineError::Validation("Empty message body".to_string()));
        }

        Ok(Self {
            message_id: message.id.clone(),
            sender: sender.to_string(),
            text: text.to_string(),
        })
    }
}

/// Every actionable text message in `payload`, in delivery order.
///
/// Non-text messages, empty bodies and status-only changes are skipped.
pub fn inbound_messages(payload: &WebhookPayload) -> Vec<InboundMessage> {
    let mut inbound = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            if change.value.messages.is_empty() {
                tracing::debug!(field = %change.field, "No messages in webhook change");
                continue;
            }

            for message in &change.value.messages {
                match InboundMessage::try_from(message) {
                    Ok(message) => inbound.push(message),
                    Err(e) => tracing::debug!(
                        message_id = %message.id,
                        msg_type = %message.message_type,
                        "Skipping message: {}",
                        e
                    ),
                }
            }
        }
    }

    inbound
}

/// Split messages into per-sender batches.
///
/// Batches follow each sender's first appearance; messages keep their
/// delivery order within a batch.
pub fn group_by_sender(messages: Vec<InboundMessage>) -> Vec<Vec<InboundMessage>> {
    let mut batches: Vec<Vec<InboundMessage>> = Vec::new();

    for message in messages {
        match batches
            .iter_mut()
            .find(|batch| batch.first().is_some_and(|m| m.sender == message.sender))
        {
            Some(batch) => batch.push(message),
            None => batches.push(vec![message]),
        }
    }

    batches
}
