//! Conversation history and prompt-size budgeting.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::MAX_HISTORY_WORDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
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

/// Estimates how many model tokens a piece of text costs.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Counts whitespace-delimited words. Cheap and only approximately matches real tokenization.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Upper bound on the estimated size of the history.
pub struct TokenBudget {
    estimator: Box<dyn TokenEstimator>,
    max_tokens: usize,
}

impl TokenBudget {
    pub fn new(estimator: impl TokenEstimator + 'static, max_tokens: usize) -> Self {
        Self {
            estimator: Box::new(estimator),
            max_tokens,
        }
    }

    pub fn words(max_words: usize) -> Self {
        Self::new(WordCountEstimator, max_words)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn estimate(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::words(MAX_HISTORY_WORDS)
    }
}

impl fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBudget")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Append-only list of turns, pruned from the front by [`History::truncate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: VecDeque<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
    }

    pub fn turns(&self) -> &VecDeque<Turn> {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn estimated_tokens(&self, budget: &TokenBudget) -> usize {
        self.turns.iter().map(|t| budget.estimate(&t.content)).sum()
    }

    /// Drops the oldest turns until the history fits `budget`. Returns how many were removed.
    ///
    /// A single turn larger than the whole budget empties the history.
    pub fn truncate(&mut self, budget: &TokenBudget) -> usize {
        let mut total = self.estimated_tokens(budget);
        let mut removed = 0;
        while total > budget.max_tokens() {
            let Some(oldest) = self.turns.pop_front() else {
                break;
            };
            total -= budget.estimate(&oldest.content);
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, remaining = self.turns.len(), total, "Truncated history");
            if self.turns.is_empty() {
                warn!(max_tokens = budget.max_tokens(), "History truncation removed every turn");
            }
        }
        removed
    }

    /// All turn contents joined by single spaces, oldest first.
    pub fn prompt_string(&self) -> String {
        self.turns
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Word-count truncation with the default estimator.
pub fn truncate(history: &mut History, max_words: usize) -> usize {
    history.truncate(&TokenBudget::words(max_words))
}
