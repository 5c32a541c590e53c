//! Output formatting for quotes, categories and sync status.
//!
//! Supports plain text, JSON and table views.

use std::collections::BTreeSet;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{Quote, SyncState};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format for programmatic use.
    Json,
    /// Compact table listing.
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {s}. Use: text, json, table")),
        }
    }
}

/// Formats a single quote for display.
pub fn format_quote(quote: &Quote) -> String {
    format!(
        "{}\n  {} {}",
        format!("“{}”", quote.text).bold(),
        "Category:".dimmed(),
        quote.category.italic()
    )
}

/// Formats quotes as a numbered plain list.
pub fn format_quotes_text(quotes: &[Quote]) -> String {
    if quotes.is_empty() {
        return "No quotes to show.".dimmed().to_string();
    }

    quotes
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{:3}. {} {}", i + 1, q.text, format!("[{}]", q.category).cyan()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats quotes as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_quotes_json(quotes: &[Quote]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(quotes)
}

/// Formats a table listing of quotes.
pub fn format_quotes_table(quotes: &[Quote]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Category", "Quote"]);

    for (i, quote) in quotes.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            quote.category.clone(),
            truncate(&quote.text, 70),
        ]);
    }

    table.to_string()
}

/// Formats the category list, marking the selected filter.
pub fn format_categories(categories: &BTreeSet<String>, selected: &str) -> String {
    let mut out = format!("{}\n", "🏷  Categories".bold());

    let marker = |name: &str| if name == selected { "●".green() } else { "○".dimmed() };

    out.push_str(&format!("  {} all\n", marker(crate::domain::ALL_CATEGORIES)));
    for category in categories {
        out.push_str(&format!("  {} {}\n", marker(category), category));
    }

    out
}

/// Formats the persisted sync bookkeeping.
pub fn format_sync_state(state: &SyncState, source_url: &str, quote_count: usize) -> String {
    let last_sync = state.last_sync.map_or_else(
        || "never".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    let mut out = format!(
        "{}\n  Source: {}\n  Quotes stored: {}\n  Last sync: {}\n  Last cycle: {} added, {} conflicts\n  Cycles completed: {}",
        "📊 Sync status".bold(),
        source_url.cyan(),
        quote_count.to_string().cyan(),
        last_sync.yellow(),
        state.last_added.to_string().green(),
        state.last_conflicts.to_string().yellow(),
        state.total_cycles
    );

    if let Some(error) = &state.last_error {
        out.push_str(&format!("\n  Last error: {}", error.red()));
    }

    out
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
