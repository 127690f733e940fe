use super::openai::ChatCompletions;
use super::{CompletionBackend, GenerationParams};
use crate::config::GroqConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use sdk::types::ConversationTurn;

/// Groq provider (Llama models over the OpenAI-compatible endpoint)
pub struct GroqProvider {
    inner: ChatCompletions,
}

impl GroqProvider {
    pub fn new(config: &GroqConfig, api_key: SecretString, params: GenerationParams) -> Self {
        Self {
            inner: ChatCompletions::new(&config.base_url, &config.model, api_key, params),
        }
    }
}

#[async_trait]
impl CompletionBackend for GroqProvider {
    fn name(&self) -> &str {
        "groq"
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
