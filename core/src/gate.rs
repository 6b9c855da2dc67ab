//! One-shot, version-gated migration execution.
//!
//! A [`MigrationGate`] compares each declared migration version against the
//! ledger persisted in a [`KvStore`] and runs the migration's action only if
//! that version has not been migrated yet. Declarations must arrive in
//! strictly increasing order within one process run.
//!
//! # Example
//!
//! ```
//! use version_gate_core::{MemoryStore, MigrationGate, MigrationOutcome};
//!
//! let mut store = MemoryStore::new();
//! // First launch of 1.0 seeds the ledger.
//! MigrationGate::new(&mut store, "1.0").unwrap();
//!
//! // The user upgrades to 2.0.
//! let mut gate = MigrationGate::new(&mut store, "2.0").unwrap();
//! let outcome = gate
//!     .run_if_due("1.5", || {
//!         // rewrite caches, move files, ...
//!         Ok(())
//!     })
//!     .unwrap();
//! assert_eq!(outcome, MigrationOutcome::Executed);
//!
//! // Later launches skip it.
//! let mut gate = MigrationGate::new(&mut store, "2.0").unwrap();
//! let outcome = gate.run_if_due("1.5", || Ok(())).unwrap();
//! assert_eq!(outcome, MigrationOutcome::Skipped);
//! ```
//!
//! A fresh install seeds the ledger with the running version, so no
//! migration fires retroactively. Upgrades then run everything declared
//! above the recorded version, once.

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{BoxError, GateError, Result};
use crate::store::{AppVersionProvider, KvStore};
use crate::version::VersionString;

/// Base store key for the last successfully migrated version.
pub const LAST_MIGRATED_VERSION_KEY: &str = "version-gate.last-migrated-version";

/// Base store key for the app version last seen by
/// [`MigrationGate::run_on_app_update`].
pub const LAST_APP_VERSION_KEY: &str = "version-gate.last-app-version";

/// What a migration action returns. Any error type converts with `?`.
pub type ActionResult = std::result::Result<(), BoxError>;

/// Result of gating a single migration or update action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The action ran and the ledger advanced.
    Executed,
    /// The action was not due and was not invoked.
    Skipped,
}

/// In-process ledger state. The last migrated version itself lives in the
/// store and is read on demand.
#[derive(Debug, Clone)]
struct MigrationLedger {
    current_version: VersionString,
    migrated_key: String,
    app_version_key: String,
    last_declared: Option<VersionString>,
}

/// Builds a store key, appending `-<domain>` for named ledgers.
fn storage_key(base: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) => format!("{base}-{domain}"),
        None => base.to_string(),
    }
}

fn store_error<E>(err: E) -> GateError
where
    E: std::error::Error + Send + Sync + 'static,
{
    GateError::Store(Box::new(err))
}

/// Configures and constructs a [`MigrationGate`].
///
/// # Examples
///
/// ```
/// use version_gate_core::{MemoryStore, MigrationGate};
///
/// let gate = MigrationGate::builder()
///     .domain("search-index")
///     .app_version_provider(|| Some("3.2".to_string()))
///     .build(MemoryStore::new())
///     .unwrap();
///
/// assert_eq!(gate.current_version().as_str(), "3.2");
/// assert_eq!(gate.storage_key(), "version-gate.last-migrated-version-search-index");
/// ```
#[derive(Default)]
pub struct GateBuilder {
    domain: Option<String>,
    current_version: Option<String>,
    provider: Option<Box<dyn AppVersionProvider>>,
}

impl GateBuilder {
    /// Creates a builder for the unnamed ledger with no version source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the ledger so several migration sequences can share one store.
    ///
    /// An empty name is treated as no name.
    pub fn domain(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.domain = (!name.is_empty()).then_some(name);
        self
    }

    /// Sets the running app version explicitly. Takes precedence over the
    /// provider.
    pub fn current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    /// Sets where to read the app version from when none is given
    /// explicitly.
    pub fn app_version_provider(mut self, provider: impl AppVersionProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Resolves the app version, derives the store keys and seeds the
    /// ledger on first use.
    ///
    /// # Errors
    ///
    /// - [`GateError::MissingAppVersion`] if no version source yields one.
    /// - [`GateError::InvalidFormat`] if the resolved version does not parse.
    /// - [`GateError::Store`] if reading or seeding the store fails.
    pub fn build<S: KvStore>(self, store: S) -> Result<MigrationGate<S>> {
        let raw = match self.current_version {
            Some(raw) => raw,
            None => self
                .provider
                .as_ref()
                .and_then(|p| p.app_version())
                .ok_or(GateError::MissingAppVersion)?,
        };
        let current_version = VersionString::parse(&raw)?;

        let domain = self.domain.as_deref();
        let ledger = MigrationLedger {
            current_version,
            migrated_key: storage_key(LAST_MIGRATED_VERSION_KEY, domain),
            app_version_key: storage_key(LAST_APP_VERSION_KEY, domain),
            last_declared: None,
        };

        let mut gate = MigrationGate {
            store,
            domain: self.domain,
            ledger,
        };
        gate.seed()?;
        Ok(gate)
    }
}

impl fmt::Debug for GateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateBuilder")
            .field("domain", &self.domain)
            .field("current_version", &self.current_version)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

/// Decides whether each declared migration is due and runs it at most once.
///
/// The gate owns (or mutably borrows) its store. Construct one per ledger
/// at startup and pass it to whatever code declares migrations; there is no
/// global instance.
#[derive(Debug)]
pub struct MigrationGate<S> {
    store: S,
    domain: Option<String>,
    ledger: MigrationLedger,
}

impl MigrationGate<()> {
    /// Returns a [`GateBuilder`]. The store type is fixed by
    /// [`GateBuilder::build`].
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }
}

impl<S: KvStore> MigrationGate<S> {
    /// Builds a gate over the unnamed ledger for the given app version.
    ///
    /// # Errors
    ///
    /// Same as [`GateBuilder::build`].
    pub fn new(store: S, current_version: &str) -> Result<Self> {
        GateBuilder::new().current_version(current_version).build(store)
    }

    /// Runs `action` if `version` has not been migrated yet.
    ///
    /// The ledger advances to `version` only after `action` returns `Ok`.
    /// If it returns an error (or panics) nothing is recorded and the same
    /// migration is due again on the next run.
    ///
    /// # Errors
    ///
    /// - [`GateError::InvalidFormat`] if `version` does not parse.
    /// - [`GateError::MigrationAheadOfApp`] if `version`, without its
    ///   sub-version, is newer than the running app.
    /// - [`GateError::OutOfOrderDeclaration`] if `version` is not greater
    ///   than the previous declaration on this gate.
    /// - [`GateError::CorruptLedger`] if the persisted value does not parse.
    /// - [`GateError::ActionFailed`] if `action` fails.
    /// - [`GateError::Store`] if the store cannot be read or written.
    ///
    /// None of these affect later calls except that a declaration which
    /// passed the ordering check still counts as declared.
    pub fn run_if_due<F>(&mut self, version: &str, action: F) -> Result<MigrationOutcome>
    where
        F: FnOnce() -> ActionResult,
    {
        let declared = VersionString::parse(version)?;

        if declared.strip_sub_version() > self.ledger.current_version {
            return Err(GateError::MigrationAheadOfApp {
                declared: declared.to_string(),
                current: self.ledger.current_version.to_string(),
            });
        }

        if let Some(previous) = &self.ledger.last_declared {
            if declared <= *previous {
                return Err(GateError::OutOfOrderDeclaration {
                    declared: declared.to_string(),
                    previous: previous.to_string(),
                });
            }
        }
        self.ledger.last_declared = Some(declared.clone());

        let due = match self.last_migrated_version()? {
            Some(last) => declared > last,
            None => true,
        };
        let key = self.ledger.migrated_key.clone();
        if !due {
            debug!(key = %key, version = %declared, "Migration already applied");
            return Ok(MigrationOutcome::Skipped);
        }

        debug!(key = %key, version = %declared, "Running migration");
        if let Err(source) = action() {
            warn!(key = %key, version = %declared, error = %source, "Migration failed");
            return Err(GateError::ActionFailed {
                version: declared.to_string(),
                source,
            });
        }

        self.store
            .set(&key, Some(declared.as_str()))
            .map_err(store_error)?;
        info!(key = %key, version = %declared, "Migration applied");
        Ok(MigrationOutcome::Executed)
    }

    /// Runs `action` whenever the app version differs from the one recorded
    /// by the previous successful call, including on the very first launch.
    ///
    /// Independent of [`run_if_due`](Self::run_if_due) and its ordering
    /// rules. The marker advances only if `action` succeeds.
    ///
    /// # Errors
    ///
    /// [`GateError::CorruptLedger`], [`GateError::ActionFailed`] or
    /// [`GateError::Store`], with the same meaning as for `run_if_due`.
    pub fn run_on_app_update<F>(&mut self, action: F) -> Result<MigrationOutcome>
    where
        F: FnOnce() -> ActionResult,
    {
        let key = self.ledger.app_version_key.clone();
        let current = self.ledger.current_version.clone();

        if self.read_version(&key)?.as_ref() == Some(&current) {
            return Ok(MigrationOutcome::Skipped);
        }

        debug!(key = %key, version = %current, "Running app update action");
        if let Err(source) = action() {
            warn!(key = %key, version = %current, error = %source, "App update action failed");
            return Err(GateError::ActionFailed {
                version: current.to_string(),
                source,
            });
        }

        self.store
            .set(&key, Some(current.as_str()))
            .map_err(store_error)?;
        info!(key = %key, version = %current, "App update action applied");
        Ok(MigrationOutcome::Executed)
    }

    /// Forgets this ledger's migration history.
    ///
    /// Clears the persisted last migrated version and app-update marker.
    /// The next gate built over the store reseeds to the app version it is
    /// given, so migrations at or below that version never fire. Until then
    /// every declaration on *this* gate counts as due.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Store`] if the store cannot be written.
    pub fn reset(&mut self) -> Result<()> {
        self.store
            .set(&self.ledger.migrated_key, None)
            .map_err(store_error)?;
        self.store
            .set(&self.ledger.app_version_key, None)
            .map_err(store_error)?;
        info!(key = %self.ledger.migrated_key, "Migration ledger reset");
        Ok(())
    }

    /// Reads the last migrated version from the store.
    ///
    /// # Errors
    ///
    /// [`GateError::CorruptLedger`] or [`GateError::Store`].
    pub fn last_migrated_version(&self) -> Result<Option<VersionString>> {
        self.read_version(&self.ledger.migrated_key)
    }

    /// The running app version this gate was built with.
    pub fn current_version(&self) -> &VersionString {
        &self.ledger.current_version
    }

    /// The highest version declared on this gate so far.
    pub fn last_declared_version(&self) -> Option<&VersionString> {
        self.ledger.last_declared.as_ref()
    }

    /// The ledger name, if this is a named ledger.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The store key holding the last migrated version.
    pub fn storage_key(&self) -> &str {
        &self.ledger.migrated_key
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the gate and returns the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn seed(&mut self) -> Result<()> {
        let key = &self.ledger.migrated_key;
        if self.store.get(key).map_err(store_error)?.is_none() {
            let current = self.ledger.current_version.as_str();
            self.store.set(key, Some(current)).map_err(store_error)?;
            info!(key = %key, version = %current, "Seeded migration ledger");
        }
        Ok(())
    }

    fn read_version(&self, key: &str) -> Result<Option<VersionString>> {
        let Some(raw) = self.store.get(key).map_err(store_error)? else {
            return Ok(None);
        };
        VersionString::parse(&raw)
            .map(Some)
            .map_err(|_| GateError::CorruptLedger {
                key: key.to_string(),
                value: raw,
            })
    }
}
