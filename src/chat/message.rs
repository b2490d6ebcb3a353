//! Chat messages and the ordered conversation they live in.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Visitor message.
    User,
    /// Assistant reply (real or fallback).
    Assistant,
}

/// A single message shown in the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: Role,
    /// Text content; for a typing message this is the revealed prefix.
    pub content: String,
    /// Whether the typewriter reveal is still running for this message.
    pub is_typing: bool,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, is_typing: bool) -> Self {
        Self {
            role,
            content: content.into(),
            is_typing,
            created_at: Utc::now(),
        }
    }
}

/// Errors raised when a mutation would break the conversation invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    /// Another message is still being revealed.
    #[error("an assistant reply is already being revealed")]
    AlreadyTyping,
    /// The last message is not a typing assistant message.
    #[error("no assistant reply is being revealed")]
    NotTyping,
}

/// Ordered, append-only list of messages.
///
/// The only in-place mutation allowed is on the last message while it is being
/// revealed. At most one message carries `is_typing`, it is always the last
/// one, and it is always an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether a reveal is in progress.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.messages.last().is_some_and(|m| m.is_typing)
    }

    /// Append a visitor message. Returns its index.
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<usize, ConversationError> {
        if self.is_typing() {
            return Err(ConversationError::AlreadyTyping);
        }
        self.messages.push(Message::new(Role::User, content, false));
        Ok(self.messages.len() - 1)
    }

    /// Append a complete assistant message (e.g. the greeting).
    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
    ) -> Result<usize, ConversationError> {
        if self.is_typing() {
            return Err(ConversationError::AlreadyTyping);
        }
        self.messages
            .push(Message::new(Role::Assistant, content, false));
        Ok(self.messages.len() - 1)
    }

    /// Append an empty assistant message that is about to be revealed.
    pub fn begin_typing(&mut self) -> Result<usize, ConversationError> {
        if self.is_typing() {
            return Err(ConversationError::AlreadyTyping);
        }
        self.messages.push(Message::new(Role::Assistant, "", true));
        Ok(self.messages.len() - 1)
    }

    /// Replace the content of the typing message.
    pub fn set_typing_content(&mut self, content: &str) -> Result<usize, ConversationError> {
        let index = self.typing_index()?;
        let last = &mut self.messages[index];
        last.content.clear();
        last.content.push_str(content);
        Ok(index)
    }

    /// Stop the reveal on the typing message.
    pub fn finish_typing(&mut self) -> Result<usize, ConversationError> {
        let index = self.typing_index()?;
        self.messages[index].is_typing = false;
        Ok(index)
    }

    fn typing_index(&self) -> Result<usize, ConversationError> {
        match self.messages.last() {
            Some(last) if last.is_typing => Ok(self.messages.len() - 1),
            _ => Err(ConversationError::NotTyping),
        }
    }

    /// Serialize the conversation as a plain-text transcript.
    ///
    /// One line per message, `"<speaker>: <content>"`, where the speaker is
    /// `You` for visitor messages and `assistant_name` for replies. Output is
    /// a pure function of the message list.
    #[must_use]
    pub fn transcript(&self, assistant_name: &str) -> String {
        let mut out = String::new();
        for message in &self.messages {
            let speaker = match message.role {
                Role::User => "You",
                Role::Assistant => assistant_name,
            };
            let _ = writeln!(out, "{speaker}: {}", message.content);
        }
        out
    }
}
