//! Local `SQLite` key-value storage.
//!
//! A single `kv` table stands in for the durable string-keyed slot the quote
//! collection, the selected category and the sync bookkeeping are saved to.
//! Every write is committed before the call returns.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::domain::{AppError, Result, SyncState};

/// Key holding the JSON-encoded quote sequence.
pub const QUOTES_KEY: &str = "quotes";
/// Key holding the last selected category filter (plain string).
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Key holding the JSON-encoded [`SyncState`].
pub const SYNC_STATE_KEY: &str = "syncState";

/// Key-value repository using `SQLite`.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    /// Opens or creates the local storage database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        // WAL lets the daemon and one-shot commands share the file
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(AppError::database)?;

        let storage = Self { conn };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(AppError::database)
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            ",
                params![key, value],
            )
            .map_err(AppError::database)?;

        tracing::trace!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    /// Start a write transaction that holds the database write lock.
    ///
    /// Other connections, including other processes, cannot write until the
    /// returned transaction is committed or dropped (which rolls it back).
    /// Reads and writes made through `self` meanwhile are part of it.
    ///
    /// # Errors
    /// Returns error if the lock cannot be taken within the busy timeout.
    pub fn write_transaction(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(AppError::database)
    }

    /// Get sync state, defaulting when absent or unreadable.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_sync_state(&self) -> Result<SyncState> {
        let Some(raw) = self.get(SYNC_STATE_KEY)? else {
            return Ok(SyncState::default());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable sync state: {}", e);
            SyncState::default()
        }))
    }

    /// Update sync state.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn update_sync_state(&self, state: &SyncState) -> Result<()> {
        let raw = serde_json::to_string(state).map_err(AppError::json_parse)?;
        self.set(SYNC_STATE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SyncReport;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let storage = LocalStorage::open(&db_path).unwrap();

        let count: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 1);
    }

    #[test]
    fn test_get_set_overwrite() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test.db")).unwrap();

        assert_eq!(storage.get("missing").unwrap(), None);

        storage.set(SELECTED_CATEGORY_KEY, "Life").unwrap();
        storage.set(SELECTED_CATEGORY_KEY, "Wisdom").unwrap();
        assert_eq!(
            storage.get(SELECTED_CATEGORY_KEY).unwrap().as_deref(),
            Some("Wisdom")
        );
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        LocalStorage::open(&db_path)
            .unwrap()
            .set(QUOTES_KEY, "[]")
            .unwrap();

        let reopened = LocalStorage::open(&db_path).unwrap();
        assert_eq!(reopened.get(QUOTES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_sync_state_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test.db")).unwrap();

        assert!(storage.get_sync_state().unwrap().last_sync.is_none());

        let report = SyncReport {
            added_count: 2,
            conflicted_texts: Vec::new(),
        };
        let state = SyncState::default().syncing().completed(&report);

        storage.update_sync_state(&state).unwrap();
        let loaded = storage.get_sync_state().unwrap();

        assert!(!loaded.is_syncing);
        assert!(loaded.last_sync.is_some());
        assert_eq!(loaded.last_added, 2);
    }

    #[test]
    fn test_write_transaction_rolls_back_on_drop() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test.db")).unwrap();
        storage.set(QUOTES_KEY, "[]").unwrap();

        {
            let _tx = storage.write_transaction().unwrap();
            storage.set(QUOTES_KEY, "[1]").unwrap();
        }
        assert_eq!(storage.get(QUOTES_KEY).unwrap().as_deref(), Some("[]"));

        let tx = storage.write_transaction().unwrap();
        storage.set(QUOTES_KEY, "[2]").unwrap();
        tx.commit().unwrap();
        assert_eq!(storage.get(QUOTES_KEY).unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_write_transaction_blocks_other_writers() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let holder = LocalStorage::open(&db_path).unwrap();
        let other = LocalStorage::open(&db_path).unwrap();
        other.conn.busy_timeout(std::time::Duration::ZERO).unwrap();

        let tx = holder.write_transaction().unwrap();
        assert!(other.set(QUOTES_KEY, "[]").is_err());
        tx.commit().unwrap();

        other.set(QUOTES_KEY, "[]").unwrap();
    }

    #[test]
    fn test_corrupt_sync_state_defaults() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test.db")).unwrap();

        storage.set(SYNC_STATE_KEY, "{not json").unwrap();
        let loaded = storage.get_sync_state().unwrap();

        assert_eq!(loaded.total_cycles, 0);
    }
}
