use chrono::{DateTime, Utc};
use core_types::ChatId;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Local message list of one chat. There is no message transport yet, so
/// sending only records the user's message.
#[derive(Debug, Clone)]
pub struct ChatSession {
    chat_id: ChatId,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(chat_id: impl Into<ChatId>) -> Self {
        Self {
            chat_id: chat_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Appends a user message. Blank input is ignored.
    pub fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        let content = input.trim();
        if content.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.to_string(),
            sent_at: Utc::now(),
        });
        self.messages.last()
    }
}
