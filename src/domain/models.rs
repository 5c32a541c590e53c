//! Domain models for the quote collection.
//!
//! A [`Quote`] is the only entity; [`SyncReport`] is the per-cycle outcome
//! produced by the merge step.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};

/// Sentinel category meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// A short text tagged with a category.
///
/// Two quotes are "the same quote" for merge purposes when their `text` is
/// exactly equal; `category` plays no part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// The quote text.
    pub text: String,
    /// Category label, e.g. "Wisdom".
    pub category: String,
}

impl Quote {
    /// Create a quote without validating it.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Check that both fields are non-empty after trimming.
    ///
    /// # Errors
    /// Returns `AppError::Validation` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(AppError::validation("Quote text must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::validation("Quote category must not be empty"));
        }
        Ok(())
    }

    /// Whether this quote belongs to the given filter.
    #[must_use]
    pub fn matches_category(&self, selected: &str) -> bool {
        selected == ALL_CATEGORIES || self.category == selected
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

/// Seed collection used when nothing valid has been persisted yet.
#[must_use]
pub fn default_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The only limit to our realization of tomorrow is our doubts of today.",
            "Motivation",
        ),
        Quote::new(
            "In the end, we will remember not the words of our enemies, but the silence of our friends.",
            "Wisdom",
        ),
        Quote::new(
            "Life is 10% what happens to us and 90% how we react to it.",
            "Life",
        ),
        Quote::new(
            "Success is not the key to happiness. Happiness is the key to success.",
            "Success",
        ),
    ]
}

/// Outcome of a single merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Number of incoming candidates appended to the store.
    pub added_count: usize,
    /// Texts of incoming candidates discarded because the text already existed.
    pub conflicted_texts: Vec<String>,
}

impl SyncReport {
    /// True when no candidate conflicted with an existing entry.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicted_texts.is_empty()
    }

    /// Human-readable status line for the notification sink.
    #[must_use]
    pub fn message(&self) -> String {
        if self.is_clean() {
            return format!(
                "Quotes synced with server: {} new quote(s) added.",
                self.added_count
            );
        }

        let listed = self
            .conflicted_texts
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Sync finished with {} conflict(s), existing entries kept ({} new quote(s) added). Conflicts: {}",
            self.conflicted_texts.len(),
            self.added_count,
            listed
        )
    }
}
