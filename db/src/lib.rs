//! File-backed ledger storage and configuration for version-gate.
//!
//! This crate provides a JSON [`FileStore`] implementing
//! [`KvStore`](version_gate_core::KvStore), and a YAML [`GateConfig`] that
//! describes which ledger a host uses and where it lives.
//!
//! # Quick start
//!
//! ```no_run
//! use version_gate_core::StaticVersion;
//! use version_gate_store::GateConfig;
//!
//! let config = GateConfig::load("migrations.yml").unwrap();
//! let store = config.open_file_store().unwrap();
//! let mut gate = config
//!     .gate_builder()
//!     .app_version_provider(StaticVersion::new(env!("CARGO_PKG_VERSION")))
//!     .build(store)
//!     .unwrap();
//!
//! gate.run_if_due("0.1", || {
//!     // move legacy settings into place
//!     Ok(())
//! })
//! .unwrap();
//! ```

mod config;
mod error;
mod file_store;

pub use config::{DEFAULT_TABLE_PREFIX, GateConfig, StoreConfig, StoreKind};
pub use error::{Result, StoreError};
pub use file_store::{FileStore, StoredEntry};
