//! Sync-related domain models and configuration.
//!
//! Contains types for the sync daemon configuration and the persisted
//! bookkeeping of the last sync cycle.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::SyncReport;

/// Configuration for the sync daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between sync cycles in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Whether sync is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run one cycle immediately when the daemon starts.
    #[serde(default = "default_sync_on_startup")]
    pub sync_on_startup: bool,

    /// Timeout for the remote fetch in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Remote endpoint returning a JSON array of candidate items.
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Category assigned to every remote candidate.
    #[serde(default = "default_category")]
    pub default_category: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            enabled: default_enabled(),
            sync_on_startup: default_sync_on_startup(),
            timeout_secs: default_timeout(),
            source_url: default_source_url(),
            default_category: default_category(),
        }
    }
}

impl SyncConfig {
    /// Interval between cycles as a `Duration` (never zero).
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Fetch timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_interval() -> u64 {
    30
}

const fn default_enabled() -> bool {
    true
}

const fn default_sync_on_startup() -> bool {
    true
}

const fn default_timeout() -> u64 {
    5
}

fn default_source_url() -> String {
    "https://jsonplaceholder.typicode.com/posts".to_string()
}

fn default_category() -> String {
    "General".to_string()
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Sync daemon configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Path configuration.
    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quote-manager")
    }

    /// Get the storage database path.
    #[must_use]
    pub fn storage_db_path(&self) -> PathBuf {
        self.data_dir().join("storage.db")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }
}

/// Bookkeeping for the most recent sync cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// Last successful sync timestamp.
    pub last_sync: Option<DateTime<Utc>>,

    /// Quotes added by the last successful cycle.
    pub last_added: usize,

    /// Conflicts reported by the last successful cycle.
    pub last_conflicts: usize,

    /// Number of cycles completed since the store was created.
    pub total_cycles: u64,

    /// Whether a sync is currently in progress.
    pub is_syncing: bool,

    /// Last error message if any.
    pub last_error: Option<String>,
}

impl SyncState {
    /// Mark sync as in progress.
    #[must_use]
    pub const fn syncing(mut self) -> Self {
        self.is_syncing = true;
        self
    }

    /// Record a completed cycle.
    #[must_use]
    pub fn completed(mut self, report: &SyncReport) -> Self {
        self.last_sync = Some(Utc::now());
        self.last_added = report.added_count;
        self.last_conflicts = report.conflicted_texts.len();
        self.total_cycles += 1;
        self.is_syncing = false;
        self.last_error = None;
        self
    }

    /// Set error state.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self.is_syncing = false;
        self
    }
}
