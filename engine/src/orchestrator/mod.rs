//! Message Orchestrator
//!
//! Ties one inbound message to one backend call and one history update.
//!
//! Each exchange runs `Pending -> Succeeded | Failed` exactly once; there is no
//! retry loop here (retries belong to the transport). A failed exchange leaves
//! the sender's history untouched and yields the fixed fallback reply, so the
//! caller always has a non-empty string to send.
//!
//! Known gap: if the upstream call succeeded but the response was lost (for
//! example the timeout fired first), that reply is never recorded. A retry
//! re-reads the same history and asks again.

use crate::conversation::ConversationStore;
use crate::llm::{BackendError, CompletionBackend};
use std::sync::Arc;
use std::time::Duration;

/// Reply sent when generation fails, whatever the provider
pub const FALLBACK_REPLY: &str =
    "Sorry, I encountered an error processing your message. Please try again.";

/// Default upper bound for a backend call
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text produced by the backend, unmodified
    Generated(String),

    /// Generation failed; carries no provider detail
    Fallback,
}

impl Reply {
    /// Text to deliver to the sender
    pub fn text(&self) -> &str {
        match self {
            Reply::Generated(text) => text,
            Reply::Fallback => FALLBACK_REPLY,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Generated(text) => text,
            Reply::Fallback => FALLBACK_REPLY.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Reply::Fallback)
    }
}

/// Routes inbound messages through the active backend and the history store
pub struct MessageOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    store: Arc<ConversationStore>,
    timeout: Duration,
}

impl MessageOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: Arc<ConversationStore>) -> Self {
        Self {
            backend,
            store,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Override the backend call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend_model(&self) -> &str {
        self.backend.model()
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one message from `sender`.
    ///
    /// Returns `None` when the message is empty after trimming: nothing is
    /// sent back, the backend is not called, and history is not touched.
    /// Otherwise always returns a reply, falling back on any backend error.
    pub async fn handle(&self, sender: &str, user_message: &str) -> Option<Reply> {
        if user_message.trim().is_empty() {
            tracing::debug!(sender, "Ignoring empty message");
            return None;
        }

        let history = self.store.read(sender);
        tracing::info!(
            sender,
            provider = self.backend.name(),
            history_len = history.len(),
            "Processing message"
        );

        let result = tokio::time::timeout(
            self.timeout,
            self.backend.complete(user_message, &history),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BackendError::Unavailable(format!(
                "timed out after {}s",
                self.timeout.as_secs_f32()
            )))
        });

        match result {
            Ok(reply) => {
                self.store.append_exchange(sender, user_message, reply.as_str());
                tracing::info!(
                    sender,
                    provider = self.backend.name(),
                    reply_chars = reply.chars().count(),
                    "Reply generated"
                );
                Some(Reply::Generated(reply))
            }
            Err(e) => {
                tracing::error!(
                    sender,
                    provider = self.backend.name(),
                    kind = %e.kind(),
                    error = %e,
                    "Backend call failed, sending fallback reply"
                );
                Some(Reply::Fallback)
            }
        }
    }

    /// Forget everything said with `sender`
    pub fn reset(&self, sender: &str) {
        self.store.clear(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Result as BackendResult;
    use async_trait::async_trait;
    use sdk::types::ConversationTurn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(
            &self,
            user_message: &str,
            history: &[ConversationTurn],
        ) -> BackendResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} (after {})", user_message, history.len()))
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl CompletionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-1"
        }

        async fn complete(&self, _: &str, _: &[ConversationTurn]) -> BackendResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_history_passed_to_backend() {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let orchestrator =
            MessageOrchestrator::new(backend.clone(), Arc::new(ConversationStore::default()));

        let first = orchestrator.handle("s", "one").await.unwrap();
        let second = orchestrator.handle("s", "two").await.unwrap();

        assert_eq!(first.text(), "one (after 0)");
        assert_eq!(second.text(), "two (after 2)");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_whitespace_message_is_ignored() {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(ConversationStore::default());
        let orchestrator = MessageOrchestrator::new(backend.clone(), store.clone());

        assert!(orchestrator.handle("s", "  \n\t ").await.is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_yields_fallback_without_mutation() {
        let store = Arc::new(ConversationStore::default());
        let orchestrator = MessageOrchestrator::new(Arc::new(SlowBackend), store.clone())
            .with_timeout(Duration::from_millis(20));

        let reply = orchestrator.handle("s", "hello?").await.unwrap();

        assert_eq!(reply, Reply::Fallback);
        assert_eq!(reply.text(), FALLBACK_REPLY);
        assert!(store.read("s").is_empty());
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(Reply::Generated("hi".into()).into_text(), "hi");
        assert!(Reply::Fallback.is_fallback());
        assert!(!Reply::Fallback.text().is_empty());
    }
}
