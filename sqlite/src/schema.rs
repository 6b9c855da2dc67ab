//! SQL generation for the prefixed ledger table.
//!
//! The ledger is a single table, `{prefix}ledger`:
//!
//! | column       | type | notes                          |
//! |--------------|------|--------------------------------|
//! | `key`        | TEXT | primary key                    |
//! | `value`      | TEXT | stored version string          |
//! | `created_at` | TEXT | `datetime('now')` on insert    |
//! | `updated_at` | TEXT | refreshed on every write       |
//!
//! Prefixes must contain only alphanumeric characters and underscores, so
//! several applications (or test runs) can keep isolated ledgers in one
//! database file.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Name of the ledger table for `prefix`.
pub(crate) fn ledger_table(prefix: &str) -> String {
    format!("{prefix}ledger")
}

/// Generates the `CREATE TABLE` statement for the ledger.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is empty or contains
/// characters other than alphanumerics and underscores.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}ledger (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#
    );
    Ok(sql)
}

/// Generates the `DROP TABLE` statement for the ledger.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    Ok(format!("DROP TABLE IF EXISTS {prefix}ledger;"))
}
