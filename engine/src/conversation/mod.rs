//! Conversation Store
//!
//! Per-sender rolling history, kept in memory for the life of the process.
//! Backed by `DashMap`, so locking is sharded by key: operations on one sender
//! never wait on a global lock held for another.
//!
//! Every operation takes and releases its guard before returning. Reads hand
//! out owned snapshots, so no guard is ever held across an `.await`.

use dashmap::DashMap;
use sdk::types::{ConversationTurn, Role};
use std::collections::VecDeque;

/// Default number of turns kept per sender
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// In-memory, bounded, per-sender conversation history
#[derive(Debug)]
pub struct ConversationStore {
    sessions: DashMap<String, VecDeque<ConversationTurn>>,
    max_history: usize,
}

impl ConversationStore {
    /// Create a store keeping at most `max_history` turns per sender.
    ///
    /// A bound of zero is raised to one.
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        tracing::info!(max_history, "Conversation store initialized");
        Self {
            sessions: DashMap::new(),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Snapshot of the sender's history, oldest first. Empty if unknown.
    pub fn read(&self, sender: &str) -> Vec<ConversationTurn> {
        self.sessions
            .get(sender)
            .map(|session| session.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append one turn, creating the session if needed.
    pub fn append(&self, sender: &str, role: Role, content: impl Into<String>) {
        self.push_all(sender, [ConversationTurn::new(role, content)]);
    }

    /// Append a completed exchange (user turn, then assistant turn).
    ///
    /// Both turns land under the same guard, so overlapping exchanges for one
    /// sender never interleave.
    pub fn append_exchange(
        &self,
        sender: &str,
        user_message: impl Into<String>,
        reply: impl Into<String>,
    ) {
        self.push_all(
            sender,
            [
                ConversationTurn::user(user_message),
                ConversationTurn::assistant(reply),
            ],
        );
    }

    /// Drop the sender's session. No-op if absent.
    pub fn clear(&self, sender: &str) {
        if self.sessions.remove(sender).is_some() {
            tracing::info!(sender, "Cleared conversation history");
        }
    }

    /// Number of senders with a live session
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn push_all<const N: usize>(&self, sender: &str, turns: [ConversationTurn; N]) {
        let mut session = self.sessions.entry(sender.to_string()).or_default();
        session.extend(turns);

        let overflow = session.len().saturating_sub(self.max_history);
        if overflow > 0 {
            session.drain(..overflow);
            tracing::debug!(
                sender,
                evicted = overflow,
                max_history = self.max_history,
                "Conversation history truncated"
            );
        }

        tracing::debug!(sender, history_len = session.len(), "Conversation updated");
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_unknown_sender_is_empty() {
        let store = ConversationStore::default();
        assert!(store.read("+15550000").is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_append_creates_session_lazily() {
        let store = ConversationStore::default();
        store.append("+15550001", Role::User, "hi");

        let history = store.read("+15550001");
        assert_eq!(history, vec![ConversationTurn::user("hi")]);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_append_exchange_order() {
        let store = ConversationStore::default();
        store.append_exchange("+15550001", "hi", "hello");

        assert_eq!(
            store.read("+15550001"),
            vec![
                ConversationTurn::user("hi"),
                ConversationTurn::assistant("hello")
            ]
        );
    }

    #[test]
    fn test_truncation_keeps_most_recent() {
        let store = ConversationStore::new(4);
        for i in 0..5 {
            store.append("s", Role::User, format!("m{}", i));
        }

        let contents: Vec<String> = store
            .read("s")
            .iter()
            .map(|t| t.content().to_string())
            .collect();
        assert_eq!(contents, vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_clear_removes_session() {
        let store = ConversationStore::default();
        store.append_exchange("a", "hi", "hello");
        store.append_exchange("b", "hey", "yo");

        store.clear("a");
        assert!(store.read("a").is_empty());
        assert_eq!(store.read("b").len(), 2);

        // Clearing an unknown sender is a no-op
        store.clear("nobody");
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_zero_bound_is_raised() {
        let store = ConversationStore::new(0);
        assert_eq!(store.max_history(), 1);
        store.append_exchange("s", "hi", "hello");
        assert_eq!(store.read("s"), vec![ConversationTurn::assistant("hello")]);
    }
}
