//! Error types for version parsing and migration gating.
//!
//! Every failure of [`MigrationGate`](crate::MigrationGate) is returned to the
//! caller as a [`GateError`]; nothing is logged and dropped.

use thiserror::Error;

/// Boxed error type returned by migration actions and store backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing versions or gating migrations.
#[derive(Debug, Error)]
pub enum GateError {
    /// Version string does not match the `N[.N]*[-N]` grammar.
    #[error("invalid version format: '{0}'")]
    InvalidFormat(String),

    /// A migration was declared at or below the previously declared version.
    #[error("migration {declared} declared out of order: must be greater than {previous}")]
    OutOfOrderDeclaration { declared: String, previous: String },

    /// A migration was declared for a version newer than the running app.
    #[error("migration {declared} is ahead of the current app version {current}")]
    MigrationAheadOfApp { declared: String, current: String },

    /// Neither an explicit version nor the provider supplied an app version.
    #[error("no current app version was given and the provider returned none")]
    MissingAppVersion,

    /// The persisted ledger value is not a valid version.
    #[error("ledger key '{key}' holds an invalid version: '{value}'")]
    CorruptLedger { key: String, value: String },

    /// The migration action itself failed; the ledger was not advanced.
    #[error("migration {version} failed: {source}")]
    ActionFailed {
        version: String,
        #[source]
        source: BoxError,
    },

    /// The backing key-value store failed.
    #[error("store error: {0}")]
    Store(#[source] BoxError),
}

/// Convenience alias for results with [`GateError`].
pub type Result<T> = std::result::Result<T, GateError>;
