//! Error types for file-backed ledger storage and configuration.
//!
//! Covers I/O, JSON ledger encoding, YAML configuration parsing, and
//! configuration validation.

use thiserror::Error;

/// Errors that can occur while reading or writing ledger files and config.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Ledger file is not valid JSON or could not be serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Configuration is structurally valid but unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
