//! Per-session conversation history.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a [`Turn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The chatbot.
    Assistant,
}

impl Role {
    /// Label used when history is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub text: String,
}

impl Turn {
    /// A user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    /// An assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// An append-only, ordered log of turns owned by one chat session.
///
/// Memory is never shared between sessions and never truncated. A cap on
/// how much history reaches the model is applied when prompts are assembled
/// (see [`RagConfig::max_history_turns`](crate::RagConfig)).
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    session_id: String,
    turns: Vec<Turn>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    /// Start an empty conversation with a fresh session id.
    pub fn new() -> Self {
        Self::with_session_id(Uuid::new_v4().to_string())
    }

    /// Start an empty conversation with the given session id.
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), turns: Vec::new() }
    }

    /// Identifier of the owning session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append one turn.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append a question and its answer as a user/assistant pair.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    /// All turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of stored turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns have been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget every turn. Only called on an explicit user reset.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
