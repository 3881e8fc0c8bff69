//! Conversation state and the chat engine abstraction
//!
//! Engines are stateless; the caller owns a [`ChatHistory`] per
//! conversation and lends it to the engine for each turn.

mod engine;
mod prompts;

pub use engine::*;
pub use prompts::*;

use crate::error::Result;
use crate::llm::ChatMessage;
use crate::store::ScoredNode;
use async_trait::async_trait;
use serde::Serialize;

/// Ordered messages of one conversation
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

/// Result of one chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// Generated answer, unmodified
    pub response: String,
    /// Nodes the answer was grounded on
    pub sources: Vec<ScoredNode>,
    /// Question used for retrieval after condensing
    pub standalone_question: String,
}

/// A conversational question-answering engine
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Answer `message` in the context of `history`; on success the user
    /// message and the answer are appended to `history`
    async fn chat(&self, history: &mut ChatHistory, message: &str) -> Result<ChatReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_recent_and_clear() {
        let mut history = ChatHistory::new();
        assert!(history.is_empty());

        history.push(ChatMessage::user("one"));
        history.push(ChatMessage::assistant("two"));
        history.push(ChatMessage::user("three"));

        assert_eq!(history.len(), 3);
        let recent: Vec<&str> = history.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["two", "three"]);
        assert_eq!(history.recent(10).len(), 3);

        history.clear();
        assert!(history.is_empty());
    }
}
