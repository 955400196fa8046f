//! Bounded conversation history for chat-style parsers.
//!
//! Keeps an optional system message plus a rolling list of user/assistant
//! messages, trimmed by message count and an estimated token budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAX_HISTORY_TOKENS: usize = 3000;
pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 20;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub tokens: usize,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tokens: estimate_tokens(content),
            timestamp: Utc::now(),
        }
    }
}

/// Wire shape of a chat message (`{"role": ..., "content": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Snapshot of history usage, reported through model info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub message_count: usize,
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub max_messages: usize,
    pub has_system_message: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    max_tokens: usize,
    max_messages: usize,
    system_message: Option<Message>,
    messages: Vec<Message>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_TOKENS, DEFAULT_MAX_HISTORY_MESSAGES)
    }
}

impl HistoryManager {
    pub fn new(max_tokens: usize, max_messages: usize) -> Self {
        debug!(max_tokens, max_messages, "History manager created");
        Self {
            max_tokens,
            max_messages,
            system_message: None,
            messages: Vec::new(),
        }
    }

    pub fn set_system_message(&mut self, content: &str) {
        self.system_message = Some(Message::new(MessageRole::System, content));
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.system_message.as_ref()
    }

    pub fn add_user_message(&mut self, content: &str) {
        self.push(Message::new(MessageRole::User, content));
    }

    pub fn add_assistant_message(&mut self, content: &str) {
        self.push(Message::new(MessageRole::Assistant, content));
    }

    /// Drop the most recent message if it is a user message.
    ///
    /// Used to undo a turn whose request failed.
    pub fn pop_user_message(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(last) if last.role == MessageRole::User => self.messages.pop(),
            _ => None,
        }
    }

    /// System message first, then history oldest to newest.
    pub fn messages_for_api(&self) -> Vec<ChatMessage> {
        self.system_message
            .iter()
            .chain(self.messages.iter())
            .map(ChatMessage::from)
            .collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Clear conversation messages. The system message is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
        debug!("History cleared");
    }

    pub fn total_tokens(&self) -> usize {
        self.system_message
            .iter()
            .chain(self.messages.iter())
            .map(|m| m.tokens)
            .sum()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Time of the newest user or assistant message still in history.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.timestamp)
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            message_count: self.message_count(),
            total_tokens: self.total_tokens(),
            max_tokens: self.max_tokens,
            max_messages: self.max_messages,
            has_system_message: self.system_message.is_some(),
            last_activity: self.last_activity(),
        }
    }

    fn push(&mut self, message: Message) {
        debug!(role = message.role.as_str(), tokens = message.tokens, "History message added");
        self.messages.push(message);
        self.trim();
    }

    fn trim(&mut self) {
        while self.messages.len() > self.max_messages {
            let removed = self.messages.remove(0);
            debug!(role = removed.role.as_str(), "Dropped oldest message (count limit)");
        }

        while self.total_tokens() > self.max_tokens && self.messages.len() > 1 {
            let removed = self.messages.remove(0);
            debug!(role = removed.role.as_str(), "Dropped oldest message (token limit)");
        }

        // A reply without its question is noise for the model.
        while self
            .messages
            .first()
            .is_some_and(|m| m.role == MessageRole::Assistant)
        {
            self.messages.remove(0);
            debug!("Dropped orphaned assistant message");
        }
    }
}

/// Rough token estimate: CJK ideographs ~1.5 chars per token, everything
/// else ~4 chars per token. Never less than 1.
pub fn estimate_tokens(text: &str) -> usize {
    let (cjk, other) = text.chars().fold((0usize, 0usize), |(cjk, other), c| {
        if ('\u{4e00}'..='\u{9fff}').contains(&c) {
            (cjk + 1, other)
        } else {
            (cjk, other + 1)
        }
    });

    let estimate = (cjk as f64 / 1.5 + other as f64 / 4.0) as usize;
    estimate.max(1)
}
