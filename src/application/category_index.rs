//! Category derivation and the persisted category filter.
//!
//! Categories are never stored on their own; they are recomputed from the
//! quote collection whenever asked for. Only the selected filter persists.

use std::collections::BTreeSet;

use crate::domain::{AppError, Quote, Result, ALL_CATEGORIES};
use crate::infrastructure::local_storage::SELECTED_CATEGORY_KEY;
use crate::infrastructure::LocalStorage;

/// Distinct categories present in `quotes`.
#[must_use]
pub fn categories_of(quotes: &[Quote]) -> BTreeSet<String> {
    quotes.iter().map(|q| q.category.clone()).collect()
}

/// Quotes visible under `selected`; `"all"` disables filtering.
#[must_use]
pub fn filtered(quotes: &[Quote], selected: &str) -> Vec<Quote> {
    quotes
        .iter()
        .filter(|q| q.matches_category(selected))
        .cloned()
        .collect()
}

/// Persisted category filter.
pub struct CategoryIndex {
    storage: LocalStorage,
}

impl CategoryIndex {
    /// Create an index backed by the given storage.
    #[must_use]
    pub const fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// The persisted filter, or `"all"` if none was ever chosen.
    ///
    /// # Errors
    /// Returns error if storage cannot be read.
    pub fn get_selected(&self) -> Result<String> {
        Ok(self
            .storage
            .get(SELECTED_CATEGORY_KEY)?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ALL_CATEGORIES.to_string()))
    }

    /// Persist a new filter.
    ///
    /// # Errors
    /// Returns a validation error for a blank category, or a persistence
    /// error if the write fails.
    pub fn set_selected(&self, category: &str) -> Result<()> {
        if category.trim().is_empty() {
            return Err(AppError::validation("Category filter must not be empty"));
        }

        self.storage.set(SELECTED_CATEGORY_KEY, category)?;
        tracing::debug!(category, "Selected category saved");
        Ok(())
    }
}
