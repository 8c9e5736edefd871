//! Conversation state: the ordered turn log and per-session settings.

use crate::types::CategoryFilter;
use chrono::{DateTime, Utc};
use ragchat_llm::ModelName;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default number of prior turns used for query rewriting.
pub const DEFAULT_WINDOW_SIZE: usize = 7;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// User-selectable options for a conversation.
///
/// The controller snapshots these at the start of each turn, so changing
/// them mid-turn has no effect on that turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub model: ModelName,
    pub category: CategoryFilter,

    /// Rewrite follow-ups using recent turns
    pub use_history: bool,

    /// Answer from retrieved context; when off the model answers directly
    pub use_retrieval: bool,

    /// Surface retrieved passages and the gate verdict to the user
    pub debug: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: ModelName::default(),
            category: CategoryFilter::All,
            use_history: true,
            use_retrieval: true,
            debug: false,
        }
    }
}

/// Session-scoped conversation.
///
/// The turn log only grows during a session; `reset` is the sole way to
/// shrink it.
#[derive(Debug, Clone)]
pub struct ConversationState {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    turns: Vec<Turn>,
    window_size: usize,
    pub settings: SessionSettings,
}

impl ConversationState {
    pub fn new(window_size: usize, settings: SessionSettings) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
            window_size,
            settings,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The recent turns used to contextualize the latest question.
    ///
    /// Returns the last `min(window_size, len - 1)` turns, never including
    /// the most recent one (the question in flight). Empty when the log is
    /// empty.
    pub fn chat_history(&self) -> &[Turn] {
        let Some(end) = self.turns.len().checked_sub(1) else {
            return &[];
        };
        let start = end.saturating_sub(self.window_size);
        &self.turns[start..end]
    }

    /// Clear the turn log. Settings are kept. Idempotent.
    pub fn reset(&mut self) {
        if !self.turns.is_empty() {
            tracing::debug!(
                "Resetting conversation {} ({} turns)",
                self.session_id,
                self.turns.len()
            );
        }
        self.turns.clear();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_turns(window_size: usize, count: usize) -> ConversationState {
        let mut state = ConversationState::new(window_size, SessionSettings::default());
        for i in 0..count {
            if i % 2 == 0 {
                state.push(Turn::user(format!("q{}", i)));
            } else {
                state.push(Turn::assistant(format!("a{}", i)));
            }
        }
        state
    }

    #[test]
    fn test_history_empty_log() {
        let state = state_with_turns(7, 0);
        assert!(state.chat_history().is_empty());
    }

    #[test]
    fn test_history_single_turn_excludes_in_flight() {
        let state = state_with_turns(7, 1);
        assert!(state.chat_history().is_empty());
    }

    #[test]
    fn test_history_length_is_min_of_window_and_prior_turns() {
        for window in [0usize, 1, 3, 7] {
            for len in 1..12usize {
                let state = state_with_turns(window, len);
                let history = state.chat_history();
                assert_eq!(
                    history.len(),
                    window.min(len - 1),
                    "window {} len {}",
                    window,
                    len
                );
            }
        }
    }

    #[test]
    fn test_history_is_the_most_recent_prior_turns() {
        let state = state_with_turns(2, 5);
        let history = state.chat_history();

        assert_eq!(history[0].content, "q2");
        assert_eq!(history[1].content, "a3");
    }

    #[test]
    fn test_reset_is_idempotent_and_keeps_settings() {
        let mut state = state_with_turns(7, 4);
        state.settings.category = CategoryFilter::parse("book");

        state.reset();
        assert!(state.is_empty());
        state.reset();
        assert!(state.is_empty());
        assert_eq!(state.settings.category, CategoryFilter::parse("book"));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
