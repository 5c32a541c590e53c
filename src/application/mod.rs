//! Application layer - use cases and orchestration.
//!
//! This layer owns the quote store, the category filter and the sync
//! engine, plus output formatting for the CLI.

pub mod category_index;
pub mod formatter;
pub mod notification;
pub mod quote_store;
pub mod sync_service;

pub use category_index::{categories_of, filtered, CategoryIndex};
pub use formatter::{
    format_categories, format_quote, format_quotes_json, format_quotes_table, format_quotes_text,
    format_sync_state, OutputFormat,
};
pub use notification::{ConsoleNotifier, TracingNotifier};
pub use quote_store::{ImportMode, QuoteStore};
pub use sync_service::{CycleOutcome, SyncEngine};
