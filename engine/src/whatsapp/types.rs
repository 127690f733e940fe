//! WhatsApp Cloud API payloads.

use serde::{Deserialize, Serialize};

/// Root of a webhook notification
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Always `whatsapp_business_account` for message notifications
    pub object: String,
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    /// WhatsApp Business Account id
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<WebhookMetadata>,
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    /// Delivery/read receipts for messages we sent; never acted upon
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMetadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookContact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

/// One inbound message as delivered by the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    /// Sender's phone number
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    /// `text`, `image`, `audio`, `location`, ...
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextBody {
    pub body: String,
}

/// Outbound text message
#[derive(Debug, Clone, Serialize)]
pub struct TextMessage<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub text: TextBody,
}

impl<'a> TextMessage<'a> {
    pub fn new(to: &'a str, body: impl Into<String>) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            message_type: "text",
            text: TextBody { body: body.into() },
        }
    }
}

/// Outbound read receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReadReceipt<'a> {
    pub messaging_product: &'static str,
    pub status: &'static str,
    pub message_id: &'a str,
}

impl<'a> ReadReceipt<'a> {
    pub fn new(message_id: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        }
    }
}
