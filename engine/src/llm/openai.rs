use super::{non_empty_reply, send_json, BackendError, CompletionBackend, GenerationParams};
use crate::config::OpenAIConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use reqwest::Client;
use sdk::types::ConversationTurn;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the OpenAI chat-completions wire format.
///
/// Shared by OpenAI and Groq (Groq serves the same API under its own base URL).
/// The persona instruction travels in-band as the first `system` message.
pub(crate) struct ChatCompletions {
    base_url: String,
    model: String,
    api_key: SecretString,
    params: GenerationParams,
    client: Client,
}

impl ChatCompletions {
    pub(crate) fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        params: GenerationParams,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            params,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn complete(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": self.model,
            "messages": build_messages(user_message, history),
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
            "top_p": 1,
            "stream": false,
        });

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload);

        let data = send_json(request).await?;
        extract_reply(&data)
    }
}

/// Persona first, then history in order, then the current message.
pub(crate) fn build_messages(user_message: &str, history: &[ConversationTurn]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(json!({
        "role": "system",
        "content": super::PERSONA_PROMPT
    }));
    for turn in history {
        messages.push(json!({
            "role": turn.role().as_str(),
            "content": turn.content()
        }));
    }
    messages.push(json!({
        "role": "user",
        "content": user_message
    }));
    messages
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub(crate) fn extract_reply(data: &Value) -> super::Result<String> {
    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| BackendError::MalformedResponse("No choices in response".to_string()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| BackendError::MalformedResponse("No message content in choice".to_string()))?;

    non_empty_reply(content.to_string())
}

pub struct OpenAIProvider {
    inner: ChatCompletions,
}

impl OpenAIProvider {
    pub fn new(config: &OpenAIConfig, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            inner: ChatCompletions::new(&config.base_url, &config.model, api_key, params),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> super::Result<String> {
        self.inner.complete(user_message, history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_puts_persona_first() {
        let history = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
        ];
        let messages = build_messages("how are you?", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], super::super::PERSONA_PROMPT);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "hi");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "how are you?");
    }

    #[test]
    fn test_extract_reply() {
        let data = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }]
        });
        assert_eq!(extract_reply(&data).unwrap(), "Hello!");
    }

    #[test]
    fn test_extract_reply_missing_choices() {
        let err = extract_reply(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_reply_null_content() {
        let data = json!({ "choices": [{ "message": { "content": null } }] });
        assert!(matches!(
            extract_reply(&data),
            Err(BackendError::MalformedResponse(_))
        ));
    }
}
