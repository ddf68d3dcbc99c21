//! Conversation memory
//!
//! Per-session message log that feeds prompt composition and rendering.

pub mod store;

pub use store::{ConversationMessage, ConversationStore, MessageRole};
