//! Quote Manager - a local quote collection kept in sync with a remote feed.
//!
//! Quotes are stored in a local `SQLite` key-value file. A sync cycle pulls
//! candidates from the configured HTTP endpoint and merges them in; existing
//! quotes always win on conflict.
//!
//! QUICK START:
//!   quote-manager show                     # Random quote from the saved filter
//!   quote-manager add "Be kind" Life       # Add a quote
//!   quote-manager filter Wisdom            # Save a category filter
//!   quote-manager export -o quotes.json    # Export everything as JSON
//!   quote-manager import quotes.json       # Append quotes from a file
//!   quote-manager daemon                   # Sync every 30 seconds

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    categories_of, filtered, format_categories, format_quote, format_quotes_json,
    format_quotes_table, format_quotes_text, format_sync_state, CategoryIndex, ConsoleNotifier,
    CycleOutcome, ImportMode, OutputFormat, QuoteStore, SyncEngine, TracingNotifier,
};
use cli::{Cli, Commands};
use domain::{AppConfig, AppError, Quote};
use infrastructure::{ensure_config_exists, load_config, HttpQuoteSource, LocalStorage};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The daemon logs its cycles at info level by default
    let verbosity = if matches!(cli.command, Commands::Daemon { .. }) {
        cli.verbose.max(1)
    } else {
        cli.verbose
    };
    setup_logging(verbosity);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(if e.is_validation() { 2 } else { 1 });
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;
    let config = load_config(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Show { category } => cmd_show(&config, category, format)?,
        Commands::List { category } => cmd_list(&config, category, format)?,
        Commands::Add { text, category } => cmd_add(&config, text, category)?,
        Commands::Categories => cmd_categories(&config, format)?,
        Commands::Filter { category } => cmd_filter(&config, &category)?,
        Commands::Import { file, replace } => cmd_import(&config, &file, replace)?,
        Commands::Export { output } => cmd_export(&config, output.as_deref())?,
        Commands::Sync => cmd_sync(&config).await?,
        Commands::Daemon { interval } => cmd_daemon(config, interval).await?,
        Commands::Status => cmd_status(&config, format)?,
        Commands::Init => cmd_init(&config)?,
    }

    Ok(())
}

/// Open the quote store for the configured data directory.
fn open_store(config: &AppConfig) -> domain::Result<QuoteStore> {
    QuoteStore::load(LocalStorage::open(&config.storage_db_path())?)
}

/// Open the category filter for the configured data directory.
fn open_index(config: &AppConfig) -> domain::Result<CategoryIndex> {
    Ok(CategoryIndex::new(LocalStorage::open(
        &config.storage_db_path(),
    )?))
}

/// Resolve an explicit category or fall back to the saved filter.
fn resolve_category(index: &CategoryIndex, category: Option<String>) -> domain::Result<String> {
    category.map_or_else(|| index.get_selected(), Ok)
}

/// Show a random quote command.
fn cmd_show(
    config: &AppConfig,
    category: Option<String>,
    format: OutputFormat,
) -> domain::Result<()> {
    let store = open_store(config)?;
    let selected = resolve_category(&open_index(config)?, category)?;

    match (store.random(&selected), format) {
        (Some(quote), OutputFormat::Json) => {
            println!(
                "{}",
                serde_json::to_string_pretty(quote).map_err(AppError::json_parse)?
            );
        }
        (Some(quote), _) => println!("{}", format_quote(quote)),
        (None, _) => println!("No quotes in category '{selected}'."),
    }

    Ok(())
}

/// List quotes command.
fn cmd_list(
    config: &AppConfig,
    category: Option<String>,
    format: OutputFormat,
) -> domain::Result<()> {
    let store = open_store(config)?;
    let selected = resolve_category(&open_index(config)?, category)?;
    let quotes = filtered(store.quotes(), &selected);

    let output = match format {
        OutputFormat::Text => format_quotes_text(&quotes),
        OutputFormat::Json => format_quotes_json(&quotes).map_err(AppError::json_parse)?,
        OutputFormat::Table => format_quotes_table(&quotes),
    };

    println!("{output}");
    Ok(())
}

/// Add a quote command.
fn cmd_add(config: &AppConfig, text: String, category: String) -> domain::Result<()> {
    let mut store = open_store(config)?;
    let index = open_index(config)?;

    store.add(Quote::new(text, category))?;
    println!("{} Quote added ({} total)", "✓".green().bold(), store.len());

    print_refreshed_view(&store, &index)
}

/// List categories command.
fn cmd_categories(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let store = open_store(config)?;
    let selected = open_index(config)?.get_selected()?;
    let categories = categories_of(store.quotes());

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&categories).map_err(AppError::json_parse)?
        ),
        _ => print!("{}", format_categories(&categories, &selected)),
    }

    Ok(())
}

/// Save category filter command.
fn cmd_filter(config: &AppConfig, category: &str) -> domain::Result<()> {
    let store = open_store(config)?;
    let index = open_index(config)?;

    index.set_selected(category)?;
    let visible = filtered(store.quotes(), category);

    println!(
        "{} Filter set to '{}' ({} quote(s))",
        "✓".green().bold(),
        category.cyan(),
        visible.len()
    );

    if visible.is_empty() {
        println!("{}", "No quotes match this category yet.".dimmed());
    }

    Ok(())
}

/// Import quotes command.
fn cmd_import(config: &AppConfig, file: &std::path::Path, replace: bool) -> domain::Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| AppError::io(format!("Failed to read {}", file.display()), e))?;

    let quotes = QuoteStore::parse_import(&content)?;
    let mode = if replace {
        ImportMode::Replace
    } else {
        ImportMode::Append
    };

    let mut store = open_store(config)?;
    let index = open_index(config)?;
    let count = store.import(quotes, mode)?;

    println!(
        "{} Imported {} quote(s) from {} ({} total)",
        "✓".green().bold(),
        count,
        file.display(),
        store.len()
    );

    print_refreshed_view(&store, &index)
}

/// Export quotes command.
fn cmd_export(config: &AppConfig, output: Option<&std::path::Path>) -> domain::Result<()> {
    let store = open_store(config)?;

    match output {
        Some(path) => {
            store.export_to(path)?;
            println!(
                "{} Exported {} quote(s) to {}",
                "✓".green().bold(),
                store.len(),
                path.display()
            );
        }
        None => println!("{}", store.export_json()?),
    }

    Ok(())
}

/// Run a single sync cycle command.
async fn cmd_sync(config: &AppConfig) -> domain::Result<()> {
    let source = HttpQuoteSource::from_config(&config.sync)?;
    let store = Arc::new(Mutex::new(open_store(config)?));
    let engine = SyncEngine::new(store, source, ConsoleNotifier);

    println!("Syncing with {}...", engine.source().url().cyan());

    match engine.run_cycle().await? {
        CycleOutcome::Completed(_) | CycleOutcome::Skipped => {}
        CycleOutcome::Abandoned => {
            let state = engine.store().lock().await.storage().get_sync_state()?;
            println!(
                "{} Sync failed: {}",
                "✗".yellow().bold(),
                state.last_error.unwrap_or_default()
            );
        }
    }

    Ok(())
}

/// Run the periodic sync loop command.
async fn cmd_daemon(mut config: AppConfig, interval: Option<u64>) -> domain::Result<()> {
    if !config.sync.enabled {
        println!("Sync is disabled in {}", config.config_file_path().display());
        return Ok(());
    }

    if let Some(secs) = interval {
        config.sync.interval_secs = secs;
    }

    let source = HttpQuoteSource::from_config(&config.sync)?;
    let store = Arc::new(Mutex::new(open_store(&config)?));
    let engine = SyncEngine::new(store, source, TracingNotifier);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    engine.run(&config.sync, shutdown_rx).await;
    Ok(())
}

/// Show sync status command.
fn cmd_status(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let store = open_store(config)?;
    let state = store.storage().get_sync_state()?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&state).map_err(AppError::json_parse)?
        ),
        _ => println!(
            "{}",
            format_sync_state(&state, &config.sync.source_url, store.len())
        ),
    }

    Ok(())
}

/// Create default configuration command.
fn cmd_init(config: &AppConfig) -> domain::Result<()> {
    let (path, created) = ensure_config_exists(config)?;

    if created {
        println!("{} Created {}", "✓".green().bold(), path.display());
    } else {
        println!("Configuration already exists at {}", path.display());
    }

    Ok(())
}

/// Print the category summary and a freshly picked quote after a mutation.
fn print_refreshed_view(store: &QuoteStore, index: &CategoryIndex) -> domain::Result<()> {
    if store.is_empty() {
        println!("{}", "The collection is empty.".dimmed());
        return Ok(());
    }

    let selected = index.get_selected()?;
    let categories = categories_of(store.quotes());

    println!(
        "{} {}",
        "Categories:".dimmed(),
        categories.into_iter().collect::<Vec<_>>().join(", ")
    );

    if let Some(quote) = store.random(&selected) {
        println!();
        println!("{}", format_quote(quote));
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
