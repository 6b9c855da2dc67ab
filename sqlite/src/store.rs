//! SQLite-backed [`KvStore`] with table lifecycle operations.
//!
//! # Example
//!
//! ```no_run
//! use version_gate_core::MigrationGate;
//! use version_gate_sqlite::SqliteStore;
//!
//! let store = SqliteStore::open("state.db", "vg_").unwrap();
//! let mut gate = MigrationGate::new(store, "2.0").unwrap();
//! gate.run_if_due("2.0", || Ok(())).unwrap();
//!
//! let status = gate.store().status().unwrap();
//! assert!(status.table_exists);
//! ```

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use version_gate_core::KvStore;
use version_gate_store::{StoreConfig, StoreKind};

use crate::error::{Result, SqliteError};
use crate::schema::{generate_drop_sql, generate_schema_sql, ledger_table, validate_prefix};

/// A [`KvStore`] that keeps ledger entries in `{prefix}ledger`.
///
/// Construction creates the table if needed, so a new store is ready for
/// a [`MigrationGate`](version_gate_core::MigrationGate) straight away.
/// [`down`](Self::down) drops it again; reads and writes fail until
/// [`up`](Self::up) is called.
pub struct SqliteStore {
    conn: Connection,
    prefix: String,
}

impl SqliteStore {
    /// Wraps an open connection, creating the ledger table if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid
    /// characters, or [`SqliteError::MigrationError`] if the table cannot be
    /// created.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        let mut store = Self { conn, prefix };
        store.up()?;
        Ok(store)
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::new(conn, prefix)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn, prefix)
    }

    /// Opens the store described by a `sqlite` [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidConfig`] if the config is for another
    /// backend or has no path.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match (&config.kind, &config.path) {
            (StoreKind::Sqlite, Some(path)) => Self::open(path, config.table_prefix.clone()),
            (StoreKind::Sqlite, None) => Err(SqliteError::InvalidConfig(
                "sqlite store requires a path".into(),
            )),
            (kind, _) => Err(SqliteError::InvalidConfig(format!(
                "expected a sqlite store, found '{kind:?}'"
            ))),
        }
    }

    /// Creates the ledger table.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple times.
    /// Executes within a transaction for atomicity.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql).map_err(|e| {
            SqliteError::MigrationError(format!("failed to create ledger table: {e}"))
        })?;
        tx.commit()?;
        debug!(prefix = %self.prefix, "Ledger table ready");
        Ok(())
    }

    /// Drops the ledger table and everything in it.
    ///
    /// Uses `DROP TABLE IF EXISTS` so it is safe to call even if the table
    /// does not exist.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql).map_err(|e| {
            SqliteError::MigrationError(format!("failed to drop ledger table: {e}"))
        })?;
        tx.commit()?;
        debug!(prefix = %self.prefix, "Ledger table dropped");
        Ok(())
    }

    /// Reports whether the table exists and how many entries it holds.
    pub fn status(&self) -> Result<LedgerStatus> {
        if !self.table_exists()? {
            return Ok(LedgerStatus {
                table_exists: false,
                entry_count: 0,
            });
        }

        let table = ledger_table(&self.prefix);
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;

        Ok(LedgerStatus {
            table_exists: true,
            entry_count: count as usize,
        })
    }

    /// Lists all entries ordered by key.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let table = ledger_table(&self.prefix);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT key, value, updated_at FROM {table} ORDER BY key"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(LedgerEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// The table prefix this store was created with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the store and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn table_exists(&self) -> Result<bool> {
        let table = ledger_table(&self.prefix);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl KvStore for SqliteStore {
    type Error = SqliteError;

    fn get(&self, key: &str) -> Result<Option<String>> {
        let table = ledger_table(&self.prefix);
        let value = self
            .conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let table = ledger_table(&self.prefix);
        match value {
            Some(value) => {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {table} (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE
                         SET value = excluded.value, updated_at = datetime('now')"
                    ),
                    params![key, value],
                )?;
            }
            None => {
                self.conn
                    .execute(&format!("DELETE FROM {table} WHERE key = ?1"), [key])?;
            }
        }
        debug!(table = %table, key, value = ?value, "Wrote ledger row");
        Ok(())
    }
}

/// Snapshot of the ledger table, returned by [`SqliteStore::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatus {
    /// Whether the ledger table exists.
    pub table_exists: bool,
    /// Number of stored entries.
    pub entry_count: usize,
}

/// One row of the ledger table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Store key.
    pub key: String,
    /// Stored version string.
    pub value: String,
    /// SQLite `datetime('now')` of the last write, in UTC.
    pub updated_at: String,
}
