//! Version-gated, run-once migrations for upgrading applications.
//!
//! This crate decides, for each migration an application declares at
//! startup, whether that migration still has to run:
//!
//! - [`VersionString`]: dotted numeric version (`1.2`, `10.4.2`) with an
//!   optional sub-version suffix (`2.0-3`), compared numerically.
//! - [`MigrationGate`]: checks declarations against a persisted ledger and
//!   runs each due action once, advancing the ledger only on success.
//! - [`KvStore`]: where the ledger lives. [`MemoryStore`] is provided here;
//!   file and SQLite backends live in sibling crates.
//! - [`AppVersionProvider`]: where the running version comes from when it is
//!   not passed explicitly.
//!
//! # Example
//!
//! ```
//! use version_gate_core::{MemoryStore, MigrationGate};
//!
//! let mut store = MemoryStore::new();
//! let mut gate = MigrationGate::builder()
//!     .current_version("2.1")
//!     .build(&mut store)
//!     .unwrap();
//!
//! gate.run_if_due("1.0", || Ok(())).unwrap();
//! gate.run_if_due("2.0", || Ok(())).unwrap();
//! gate.run_if_due("2.1-1", || Ok(())).unwrap();
//!
//! // Declaring out of order is an error, not a silent no-op.
//! assert!(gate.run_if_due("1.5", || Ok(())).is_err());
//! ```

mod error;
mod gate;
mod store;
mod version;

pub use error::{BoxError, GateError, Result};
pub use gate::{
    ActionResult, GateBuilder, LAST_APP_VERSION_KEY, LAST_MIGRATED_VERSION_KEY, MigrationGate,
    MigrationOutcome,
};
pub use store::{AppVersionProvider, KvStore, MemoryStore, StaticVersion};
pub use version::VersionString;
