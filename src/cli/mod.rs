//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// Quote Manager - keep a local quote collection in sync with a remote feed.
#[derive(Parser, Debug)]
#[command(name = "quote-manager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format: text, json, or table.
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Data directory (defaults to ~/.quote-manager).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a random quote.
    Show {
        /// Category to pick from (defaults to the saved filter).
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List stored quotes.
    List {
        /// Category to list (defaults to the saved filter).
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add a new quote.
    Add {
        /// Quote text.
        text: String,

        /// Quote category.
        category: String,
    },

    /// List known categories.
    Categories,

    /// Save the category filter ("all" clears it).
    Filter {
        /// Category name or "all".
        category: String,
    },

    /// Import quotes from a JSON file.
    Import {
        /// Path to a JSON array of {"text", "category"} objects.
        file: PathBuf,

        /// Replace the collection instead of appending.
        #[arg(long)]
        replace: bool,
    },

    /// Export all quotes as JSON.
    Export {
        /// Output file path (stdout if not specified).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a single sync cycle against the remote source.
    Sync,

    /// Run the periodic sync loop until interrupted.
    Daemon {
        /// Override the sync interval in seconds.
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show sync status.
    Status,

    /// Create the default configuration file.
    Init,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
