//! Conversation history: role-tagged turns, trimmed and optionally persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Ordered conversation history for one connection.
///
/// The system preamble is kept separate from the turn list so that trimming
/// never drops it: `to_turns()` always yields the preamble first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub session_id: String,
    pub system_preamble: String,
    pub turns: Vec<Turn>,
    /// Maximum number of user/assistant turn *pairs* retained; older pairs
    /// are dropped from the front once exceeded.
    #[serde(default = "default_max_turn_pairs")]
    pub max_turn_pairs: usize,
}

fn default_max_turn_pairs() -> usize {
    10
}

impl ConversationHistory {
    pub fn new(session_id: impl Into<String>, system_preamble: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            system_preamble: system_preamble.into(),
            turns: Vec::new(),
            max_turn_pairs: default_max_turn_pairs(),
        }
    }

    pub fn with_max_turn_pairs(mut self, max_turn_pairs: usize) -> Self {
        self.max_turn_pairs = max_turn_pairs;
        self
    }

    /// Append a turn and trim to `max_turn_pairs` pairs from the front.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.trim();
    }

    fn trim(&mut self) {
        let max_len = self.max_turn_pairs * 2;
        if self.turns.len() > max_len {
            let excess = self.turns.len() - max_len;
            self.turns.drain(0..excess);
        }
    }

    /// Remove the most recently pushed turn. Used to roll back a user turn
    /// when an LLM call fails after all retries are exhausted.
    pub fn pop(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = Turn::user("what time is it");
        assert_eq!(turn.role, TurnRole::User);
        assert!(turn.word_count() > 0);
    }

    #[test]
    fn test_history_trims_to_turn_cap() {
        let mut history = ConversationHistory::new("s1", "preamble").with_max_turn_pairs(2);
        for i in 0..5 {
            history.push(Turn::user(format!("q{i}")));
            history.push(Turn::assistant(format!("a{i}")));
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.turns.first().unwrap().content, "q3");
    }

    #[test]
    fn test_pop_rolls_back_last_turn() {
        let mut history = ConversationHistory::new("s1", "preamble");
        history.push(Turn::user("hello"));
        assert_eq!(history.len(), 1);
        history.pop();
        assert!(history.is_empty());
    }
}
