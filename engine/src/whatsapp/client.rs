use super::types::{ReadReceipt, TextMessage};
use super::OutboundChannel;
use crate::config::WhatsAppConfig;
use crate::secrets::{scrub_secrets, SecretString};
use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use serde::Serialize;
use std::time::Duration;

/// WhatsApp Cloud API client for outbound messages
pub struct WhatsAppClient {
    client: Client,
    messages_url: String,
    access_token: SecretString,
}

impl WhatsAppClient {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the access token is missing.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, EngineError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|token| !token.is_blank())
            .ok_or_else(|| EngineError::Config("WHATSAPP_TOKEN is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/{}/messages",
                config.api_base_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, payload: &T) -> Result<serde_json::Value, EngineError> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(self.access_token.unsecure())
            .json(payload)
            .send()
            .await
            .map_err(|e| EngineError::Network(scrub_secrets(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Network(format!(
                "WhatsApp API error {}: {}",
                status.as_u16(),
                scrub_secrets(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl OutboundChannel for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), EngineError> {
        tracing::info!(to, chars = body.chars().count(), "Sending WhatsApp message");
        let result = self.post(&TextMessage::new(to, body)).await?;
        tracing::debug!(to, response = %result, "Message sent");
        Ok(())
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<(), EngineError> {
        self.post(&ReadReceipt::new(message_id)).await?;
        tracing::debug!(message_id, "Message marked as read");
        Ok(())
    }
}
