//! YAML configuration for a migration ledger.
//!
//! Describes which ledger a host uses, where it is stored, and optionally
//! pins the app version instead of reading it from a provider.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! domain: search-index
//! app_version: "2.1"
//! store:
//!   kind: sqlite
//!   path: /var/lib/myapp/state.db
//!   table_prefix: vg_
//! ```
//!
//! `domain` and `app_version` are optional. `store` and `store.path` are
//! required; `store.kind` defaults to `file` and `table_prefix` only
//! applies to `sqlite`.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use version_gate_core::{GateBuilder, MigrationGate, VersionString};

use crate::error::{Result, StoreError};
use crate::file_store::FileStore;

/// Table prefix used when the config does not name one.
pub const DEFAULT_TABLE_PREFIX: &str = "vg_";

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

/// Backend that holds the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// A JSON file, see [`FileStore`].
    #[default]
    File,
    /// A table in a SQLite database.
    Sqlite,
}

/// Where and how the ledger is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    pub kind: StoreKind,
    /// Ledger file or database path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Table prefix for the SQLite backend.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

/// Top-level ledger configuration.
///
/// # Examples
///
/// ```
/// # use version_gate_store::{GateConfig, StoreKind};
/// let yaml = r#"
/// version: "1.0"
/// domain: thumbnails
/// app_version: "3.0"
/// store:
///   kind: file
///   path: /tmp/ledger.json
/// "#;
/// let config = GateConfig::from_yaml(yaml).unwrap();
/// assert_eq!(config.store.kind, StoreKind::File);
/// assert_eq!(config.domain.as_deref(), Some("thumbnails"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Ledger name; omit for the shared unnamed ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Pinned app version; omit to supply one through
    /// [`AppVersionProvider`](version_gate_core::AppVersionProvider).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<VersionString>,
    /// Ledger storage.
    pub store: StoreConfig,
}

impl GateConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file cannot be read,
    /// [`StoreError::YamlError`] if parsing fails (including a malformed
    /// `app_version`), or [`StoreError::InvalidConfig`] if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file cannot be written, or
    /// [`StoreError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that the store section is usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the store has no path or
    /// the table prefix is empty.
    pub fn validate(&self) -> Result<()> {
        if self.store.path.is_none() {
            return Err(StoreError::InvalidConfig(format!(
                "store kind '{:?}' requires a path",
                self.store.kind
            )));
        }
        if self.store.table_prefix.is_empty() {
            return Err(StoreError::InvalidConfig("table_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Returns a [`GateBuilder`] with `domain` and `app_version` applied.
    ///
    /// A host that leaves `app_version` unset adds its own provider before
    /// calling [`GateBuilder::build`].
    pub fn gate_builder(&self) -> GateBuilder {
        let mut builder = MigrationGate::builder();
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(version) = &self.app_version {
            builder = builder.current_version(version.as_str());
        }
        builder
    }

    /// Opens the configured [`FileStore`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the store kind is not
    /// `file`, or any error from [`FileStore::open`].
    pub fn open_file_store(&self) -> Result<FileStore> {
        match (&self.store.kind, &self.store.path) {
            (StoreKind::File, Some(path)) => FileStore::open(path),
            (kind, _) => Err(StoreError::InvalidConfig(format!(
                "expected a file store, found '{kind:?}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
domain: search-index
app_version: "2.1"
store:
  kind: sqlite
  path: /var/lib/app/state.db
  table_prefix: app_
"#
    }

    fn minimal_yaml() -> &'static str {
        r#"
version: "1.0"
store:
  path: ledger.json
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config = GateConfig::from_yaml(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.domain.as_deref(), Some("search-index"));
        assert_eq!(config.app_version.as_ref().unwrap().as_str(), "2.1");
        assert_eq!(config.store.kind, StoreKind::Sqlite);
        assert_eq!(config.store.path.as_deref(), Some(Path::new("/var/lib/app/state.db")));
        assert_eq!(config.store.table_prefix, "app_");
    }

    #[test]
    fn test_deserialize_minimal_defaults_to_file() {
        let config = GateConfig::from_yaml(minimal_yaml()).unwrap();
        assert!(config.domain.is_none());
        assert!(config.app_version.is_none());
        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.store.table_prefix, DEFAULT_TABLE_PREFIX);
    }

    #[test]
    fn test_missing_store_section_rejected() {
        let yaml = r#"
version: "1.0"
app_version: "2.0"
"#;
        assert!(matches!(
            GateConfig::from_yaml(yaml),
            Err(StoreError::YamlError(_))
        ));
    }

    #[test]
    fn test_persistent_store_requires_path() {
        let yaml = r#"
version: "1.0"
store:
  kind: file
"#;
        assert!(matches!(
            GateConfig::from_yaml(yaml),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_app_version_rejected() {
        let yaml = r#"
version: "1.0"
app_version: "2.1.300"
"#;
        assert!(matches!(
            GateConfig::from_yaml(yaml),
            Err(StoreError::YamlError(_))
        ));
    }

    #[test]
    fn test_gate_builder_applies_domain_and_version() {
        let config = GateConfig::from_yaml(sample_yaml()).unwrap();
        let gate = config
            .gate_builder()
            .build(version_gate_core::MemoryStore::new())
            .unwrap();
        assert_eq!(gate.domain(), Some("search-index"));
        assert_eq!(gate.current_version().as_str(), "2.1");
    }

    #[test]
    fn test_open_file_store_rejects_other_kinds() {
        let config = GateConfig::from_yaml(sample_yaml()).unwrap();
        assert!(matches!(
            config.open_file_store(),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yml");

        let original = GateConfig::from_yaml(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = GateConfig::load(&path).unwrap();
        assert_eq!(loaded.domain, original.domain);
        assert_eq!(loaded.app_version, original.app_version);
        assert_eq!(loaded.store.kind, original.store.kind);
        assert_eq!(loaded.store.path, original.store.path);
    }
}
