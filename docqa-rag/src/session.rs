//! Conversation sessions.
//!
//! A [`Session`] is created when a user starts talking to the assistant,
//! grows by [`Session::append_turn`], and is cleared only by
//! [`Session::reset`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// An ordered conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    history: Vec<ConversationTurn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), history: Vec::new() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Turns in the order they were appended.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ConversationTurn { role, content: content.into() });
    }

    /// Drop all turns. The session id is kept.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
