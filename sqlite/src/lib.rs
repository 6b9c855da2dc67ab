//! SQLite ledger store for version-gate.
//!
//! Keeps migration ledgers in a single prefixed table so they can live in
//! the same database file as the application's own data. Implements
//! [`KvStore`](version_gate_core::KvStore) and adds table lifecycle
//! operations (`up`/`down`/`status`).
//!
//! # Quick start
//!
//! ```no_run
//! use version_gate_core::MigrationGate;
//! use version_gate_sqlite::SqliteStore;
//!
//! let store = SqliteStore::open("app.db", "vg_").unwrap();
//! let mut gate = MigrationGate::builder()
//!     .domain("thumbnails")
//!     .current_version("3.1")
//!     .build(store)
//!     .unwrap();
//!
//! gate.run_if_due("3.0", || {
//!     // regenerate thumbnails at the new size
//!     Ok(())
//! })
//! .unwrap();
//!
//! for entry in gate.store().entries().unwrap() {
//!     println!("{} = {} ({})", entry.key, entry.value, entry.updated_at);
//! }
//! ```
//!
//! # Table prefix customization
//!
//! The table name is `{prefix}ledger`. Prefixes must contain only ASCII
//! alphanumeric characters and underscores.

mod error;
mod schema;
mod store;

pub use error::{Result, SqliteError};
pub use schema::{generate_drop_sql, generate_schema_sql};
pub use store::{LedgerEntry, LedgerStatus, SqliteStore};
