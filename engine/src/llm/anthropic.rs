use super::{
    non_empty_reply, send_json, BackendError, CompletionBackend, GenerationParams, PERSONA_PROMPT,
};
use crate::config::AnthropicConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use reqwest::Client;
use sdk::types::{ConversationTurn, Role};
use serde_json::{json, Value};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider (Messages API)
///
/// The Messages API keeps system instructions out of the turn sequence, so the
/// persona goes into the top-level `system` field and `system` turns found in
/// the history are dropped.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    api_key: SecretString,
    params: GenerationParams,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            config,
            api_key,
            params,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

/// History without `system` turns, then the current message.
pub(crate) fn build_messages(user_message: &str, history: &[ConversationTurn]) -> Vec<Value> {
    let mut messages: Vec<Value> = history
        .iter()
        .filter(|turn| turn.role() != Role::System)
        .map(|turn| {
            json!({
                "role": turn.role().as_str(),
                "content": turn.content()
            })
        })
        .collect();

    messages.push(json!({
        "role": "user",
        "content": user_message
    }));
    messages
}

/// Concatenate the `text` blocks of a Messages API response.
pub(crate) fn extract_reply(data: &Value) -> super::Result<String> {
    let content_arr = data
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| BackendError::MalformedResponse("No content array in response".to_string()))?;

    let mut full_content = String::new();
    for item in content_arr {
        let is_text = item
            .get("type")
            .and_then(|t| t.as_str())
            .map_or(true, |t| t == "text");
        if !is_text {
            continue;
        }
        if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
            full_content.push_str(text);
        }
    }

    non_empty_reply(full_content)
}

#[async_trait]
impl CompletionBackend for AnthropicProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> super::Result<String> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": self.config.model,
            "max_tokens": self.params.max_tokens,
            "temperature": self.params.temperature,
            "system": PERSONA_PROMPT,
            "messages": build_messages(user_message, history),
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload);

        let data = send_json(request).await?;
        extract_reply(&data)
    }
}
