// crates/approval-gate-store-sqlite/src/config.rs
// ============================================================================
// Module: SQLite Store Configuration
// Description: Connection and durability settings for the SQLite-backed
// approval/chain/idempotency stores.
// Purpose: Give every store constructor a single validated configuration
// shape, with pragma defaults tuned for a single-writer workload.
// Dependencies: rusqlite, serde
// ============================================================================

use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use serde::Deserialize;
use thiserror::Error;

/// Default busy timeout, in milliseconds, before a locked write fails.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// `SQLite` journal mode.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended; allows concurrent readers).
    #[default]
    Wal,
    /// Delete journal mode (legacy, single-reader-friendly filesystems).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Configuration for the SQLite-backed stores.
///
/// # Invariants
/// - `path` must resolve to a file path, not a directory.
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds, applied to every connection opened.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl SqliteStoreConfig {
    /// Builds a configuration pointed at `path` with default pragma settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
        }
    }
}

/// Errors opening or configuring a `SQLite` connection.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteConnectionError {
    /// The connection could not be opened or a pragma failed to apply.
    #[error("sqlite connection error: {0}")]
    Db(String),
}

/// Opens a connection to `config.path`, creating the file if absent, and
/// applies the durability pragmas named in `config`.
///
/// # Errors
///
/// Returns [`SqliteConnectionError`] when the connection cannot be opened
/// or a pragma fails to apply.
pub fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteConnectionError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies durability pragmas required for correct single-writer operation.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteConnectionError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            config.journal_mode.pragma_value()
        ))
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteConnectionError::Db(err.to_string()))?;
    Ok(())
}
