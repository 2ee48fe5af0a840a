//! Append-only history of observed appearance changes, kept in SQLite.
//!
//! Every operation opens its own connection and drops it before returning, so
//! the polling loop, the persistence loop and the presentation layer never
//! share a handle and a crashed caller can't leave a transaction open.

use crate::models::{LogEntry, NewLogEntry};
use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, params};
use std::fs;
use std::time::Duration;
use thiserror::Error;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS theme_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        theme_mode TEXT NOT NULL,
        source_process TEXT NOT NULL,
        details TEXT NOT NULL,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    )
";

/// How long a call waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the change history database
#[derive(Error, Debug)]
pub enum ChangeLogError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to the history database file.
///
/// Holds only the path; cloning is cheap and every clone is safe to use from
/// any thread.
#[derive(Debug, Clone)]
pub struct ChangeLogStore {
    db_path: Utf8PathBuf,
}

impl ChangeLogStore {
    /// Create the database (and its directory) if needed.
    ///
    /// This is the one failure the monitor treats as fatal: without a history
    /// store there is nothing to record changes into.
    pub fn open<P: AsRef<Utf8Path>>(db_path: P) -> Result<Self, ChangeLogError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ChangeLogError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let store = Self { db_path };
        let conn = store.connect()?;
        conn.execute(SCHEMA, [])?;

        tracing::info!("Change log initialized at {}", store.db_path);
        Ok(store)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, ChangeLogError> {
        let conn = Connection::open(self.db_path.as_std_path())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Append one record.
    pub fn append(&self, entry: &NewLogEntry) -> Result<(), ChangeLogError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO theme_logs (timestamp, theme_mode, source_process, details)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.timestamp,
                entry.theme_mode,
                entry.source_process,
                entry.details
            ],
        )?;

        tracing::info!(
            "Logged theme change: {} by {}",
            entry.theme_mode,
            entry.source_process
        );
        Ok(())
    }

    /// Up to `limit` records, newest first.
    ///
    /// Newest means most recently inserted. `created_at` only has one-second
    /// resolution, so the row id decides the order.
    pub fn query(&self, limit: usize) -> Result<Vec<LogEntry>, ChangeLogError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, theme_mode, source_process, details, COALESCE(created_at, '')
             FROM theme_logs
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                theme_mode: row.get(2)?,
                source_process: row.get(3)?,
                details: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, ChangeLogError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM theme_logs", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete every record.
    pub fn clear(&self) -> Result<(), ChangeLogError> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM theme_logs", [])?;
        tracing::info!("Logs cleared ({} entries removed)", removed);
        Ok(())
    }
}
