//! Conversation history storage
//!
//! Append-only message log for one chat session. Index 0 is always the
//! system message seeded at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TradingMateError;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Prefix used when the message is written into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::System => "System",
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        }
    }

    /// Whether messages of this role are shown to the end user
    pub fn is_renderable(&self) -> bool {
        !matches!(self, MessageRole::System)
    }
}

/// A single message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
}

impl ConversationMessage {
    /// Create a new conversation message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Conversation log for a user session
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStore {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    messages: Vec<ConversationMessage>,
}

impl ConversationStore {
    /// Create a store seeded with the session's system message
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            messages: vec![ConversationMessage::new(MessageRole::System, system_prompt)],
        }
    }

    /// Append a user or assistant message.
    ///
    /// The system message is seeded once by [`ConversationStore::new`];
    /// appending another one is rejected.
    pub fn append(&mut self, message: ConversationMessage) -> crate::Result<()> {
        if message.role == MessageRole::System {
            return Err(TradingMateError::InvalidMessage(
                "system message is seeded once per conversation".to_string(),
            ));
        }

        self.messages.push(message);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Renderable messages (system excluded), chronological
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|m| m.role.is_renderable())
    }

    /// All messages including the system message at index 0
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn last_renderable(&self) -> Option<&ConversationMessage> {
        self.history().next_back()
    }

    /// Get message count, system message included
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
