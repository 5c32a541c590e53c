//! The quote collection and its persisted mirror.
//!
//! `QuoteStore` is the single owner of quote data. Every successful mutation
//! is written through to [`LocalStorage`] before the call returns; when that
//! write fails the in-memory state is kept and the error is returned.

use std::fs;
use std::path::Path;

use rand::seq::IndexedRandom;

use crate::domain::{default_quotes, AppError, Quote, Result};
use crate::infrastructure::local_storage::QUOTES_KEY;
use crate::infrastructure::LocalStorage;

/// How imported quotes are combined with the current collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Append after the existing quotes; duplicates are kept.
    #[default]
    Append,
    /// Replace the whole collection.
    Replace,
}

/// Owner of the in-memory quote sequence.
pub struct QuoteStore {
    storage: LocalStorage,
    quotes: Vec<Quote>,
}

impl QuoteStore {
    /// Load the persisted collection, seeding defaults when absent or invalid.
    ///
    /// Malformed persisted data is logged and treated as absent.
    ///
    /// # Errors
    /// Returns error only if the storage itself cannot be queried.
    pub fn load(storage: LocalStorage) -> Result<Self> {
        let quotes = match storage.get(QUOTES_KEY)? {
            Some(raw) => decode_persisted(&raw).unwrap_or_else(|| {
                tracing::warn!("Persisted quotes are malformed, using defaults");
                default_quotes()
            }),
            None => {
                tracing::debug!("No persisted quotes, using defaults");
                default_quotes()
            }
        };

        tracing::debug!(count = quotes.len(), "Loaded quotes");
        Ok(Self { storage, quotes })
    }

    /// Validate and append a single quote, then persist.
    ///
    /// # Errors
    /// Returns a validation error (store unchanged) or a persistence error
    /// (quote kept in memory).
    pub fn add(&mut self, quote: Quote) -> Result<()> {
        quote.validate()?;

        tracing::info!(category = %quote.category, "Adding quote");
        self.update(|current| {
            let mut next = current.to_vec();
            next.push(quote);
            (next, ())
        })
    }

    /// Replace the whole collection atomically, then persist.
    ///
    /// # Errors
    /// Returns a validation error if any element is invalid (store unchanged)
    /// or a persistence error (new collection kept in memory).
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> Result<()> {
        validate_all(&quotes)?;
        self.update(|_| (quotes, ()))
    }

    /// Import a batch of quotes.
    ///
    /// Returns the number of quotes imported.
    ///
    /// # Errors
    /// Same as [`QuoteStore::replace_all`]; nothing is imported on validation
    /// failure.
    pub fn import(&mut self, quotes: Vec<Quote>, mode: ImportMode) -> Result<usize> {
        validate_all(&quotes)?;

        let count = quotes.len();
        self.update(|current| {
            let next = match mode {
                ImportMode::Append => {
                    let mut combined = current.to_vec();
                    combined.extend(quotes);
                    combined
                }
                ImportMode::Replace => quotes,
            };
            (next, ())
        })?;

        tracing::info!(count, ?mode, "Imported quotes");
        Ok(count)
    }

    /// Read-modify-write the collection under the database write lock.
    ///
    /// `apply` sees the collection as currently persisted, so writes made by
    /// another process since this store was loaded are not lost. The new
    /// collection is validated, kept in memory and persisted in the same
    /// transaction.
    ///
    /// # Errors
    /// Returns a validation error if the new collection is invalid (store
    /// unchanged) or a persistence error (new collection kept in memory,
    /// durable copy rolled back).
    pub fn update<T>(&mut self, apply: impl FnOnce(&[Quote]) -> (Vec<Quote>, T)) -> Result<T> {
        let tx = self.storage.write_transaction()?;

        let current = match self.storage.get(QUOTES_KEY)? {
            Some(raw) => decode_persisted(&raw).unwrap_or_else(|| {
                tracing::warn!("Persisted quotes are malformed, keeping in-memory copy");
                self.quotes.clone()
            }),
            None => self.quotes.clone(),
        };

        let (next, output) = apply(&current);
        validate_all(&next)?;

        self.quotes = next;
        self.persist()?;
        tx.commit().map_err(AppError::database)?;

        Ok(output)
    }

    /// Parse import JSON text into quotes.
    ///
    /// # Errors
    /// Returns a validation error unless the text is an array of objects that
    /// each carry non-empty `text` and `category` strings.
    pub fn parse_import(json: &str) -> Result<Vec<Quote>> {
        let quotes: Vec<Quote> = serde_json::from_str(json).map_err(|e| {
            AppError::validation(format!(
                "Import must be a JSON array of {{\"text\", \"category\"}} objects: {e}"
            ))
        })?;

        validate_all(&quotes)?;
        Ok(quotes)
    }

    /// Owned copy of the current collection.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Quote> {
        self.quotes.clone()
    }

    /// Borrow the current collection.
    #[must_use]
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of stored quotes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Write the full collection to durable storage.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.quotes).map_err(AppError::json_parse)?;
        self.storage.set(QUOTES_KEY, &raw)
    }

    /// Pick a random quote within the filter.
    #[must_use]
    pub fn random(&self, selected: &str) -> Option<&Quote> {
        let candidates: Vec<&Quote> = self
            .quotes
            .iter()
            .filter(|q| q.matches_category(selected))
            .collect();

        candidates.choose(&mut rand::rng()).copied()
    }

    /// Pretty-printed JSON (2-space indent) of the full collection.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.quotes).map_err(AppError::json_parse)
    }

    /// Write the export JSON to a file.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create export directory", e))?;
        }

        fs::write(path, self.export_json()?)
            .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))
    }

    /// Storage handle, for bookkeeping that lives next to the quotes.
    #[must_use]
    pub const fn storage(&self) -> &LocalStorage {
        &self.storage
    }
}

/// Decode the persisted slot, rejecting anything that fails validation.
fn decode_persisted(raw: &str) -> Option<Vec<Quote>> {
    let quotes: Vec<Quote> = serde_json::from_str(raw).ok()?;
    validate_all(&quotes).ok()?;
    Some(quotes)
}

/// Validate every quote, naming the first offending item.
fn validate_all(quotes: &[Quote]) -> Result<()> {
    for (index, quote) in quotes.iter().enumerate() {
        quote.validate().map_err(|e| match e {
            AppError::Validation { message } => {
                AppError::validation(format!("Item {}: {message}", index + 1))
            }
            other => other,
        })?;
    }
    Ok(())
}
