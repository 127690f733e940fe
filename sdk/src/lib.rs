//! Relay SDK
//!
//! Shared types and error definitions for the relay workspace.
//! Used by the engine and by its integration tests.

/// Error types and handling
pub mod errors;

/// Conversation turn types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, RelayErrorExt};
pub use types::{ConversationTurn, Role};
