//! Configuration file management.
//!
//! Handles loading TOML configuration files and writing the default one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Quote Manager Configuration
# Auto-generated - edit as needed

[sync]
# Interval between sync cycles in seconds (default: 30)
interval_secs = 30

# Whether background sync is enabled
enabled = true

# Run one cycle as soon as the daemon starts
sync_on_startup = true

# Remote fetch timeout in seconds
timeout_secs = 5

# Endpoint returning a JSON array of objects with a "title" field
source_url = "https://jsonplaceholder.typicode.com/posts"

# Category assigned to quotes pulled from the remote source
default_category = "General"

[paths]
# Custom data directory (optional, defaults to ~/.quote-manager)
# data_dir = "/custom/path"
"#;

/// Load configuration, optionally rooted at an explicit data directory.
///
/// The config file is looked up inside the data directory; when it does not
/// exist the defaults are used. An explicit `data_dir` always wins over the
/// `[paths]` section of the file.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let base = data_dir.map_or_else(AppConfig::default_data_dir, Path::to_path_buf);
    let config_path = base.join("config.toml");

    let mut config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = data_dir {
        config.paths.data_dir = Some(dir.to_path_buf());
    }

    Ok(config)
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns the config path and whether it was newly created.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(config: &AppConfig) -> Result<(PathBuf, bool)> {
    let config_path = config.config_file_path();

    if config_path.exists() {
        return Ok((config_path, false));
    }

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");

    Ok((config_path, true))
}
