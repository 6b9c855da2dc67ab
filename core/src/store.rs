//! Collaborators injected into a [`MigrationGate`](crate::MigrationGate).
//!
//! - [`KvStore`] persists the ledger. Any string key-value backend works;
//!   the workspace ships a JSON file store and a SQLite store alongside the
//!   in-memory [`MemoryStore`] defined here.
//! - [`AppVersionProvider`] supplies the running app's version when the
//!   host does not pass one explicitly.

use std::collections::HashMap;
use std::convert::Infallible;

/// String key-value persistence for migration ledgers.
///
/// Writes must be durable by the time `set` returns: the next read, even
/// from a freshly constructed store in another process, has to observe it.
pub trait KvStore {
    /// Backend failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Stores `value` under `key`. `None` removes the key.
    fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), Self::Error>;
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), Self::Error> {
        (**self).set(key, value)
    }
}

/// Process-local [`KvStore`] backed by a `HashMap`.
///
/// Nothing survives the process. Useful in tests and for hosts that keep
/// their own persistence and only want the gating logic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), Infallible> {
        match value {
            Some(value) => {
                self.entries.insert(key.to_string(), value.to_string());
            }
            None => {
                self.entries.remove(key);
            }
        }
        Ok(())
    }
}

/// Supplies the host application's current version string.
///
/// Implemented for closures, so a host can read the version lazily, and
/// for [`StaticVersion`] when it is known at compile time:
///
/// ```
/// use version_gate_core::{AppVersionProvider, StaticVersion};
///
/// let built_in = StaticVersion::new("1.4");
/// assert_eq!(built_in.app_version().as_deref(), Some("1.4"));
///
/// let from_env = || std::env::var("APP_VERSION").ok();
/// let _ = from_env.app_version();
/// ```
pub trait AppVersionProvider {
    /// Returns the running app's version, or `None` if it is unknown.
    fn app_version(&self) -> Option<String>;
}

impl<F> AppVersionProvider for F
where
    F: Fn() -> Option<String>,
{
    fn app_version(&self) -> Option<String> {
        self()
    }
}

/// A fixed app version, typically `env!("CARGO_PKG_VERSION")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVersion(String);

impl StaticVersion {
    /// Wraps a version string.
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl AppVersionProvider for StaticVersion {
    fn app_version(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
