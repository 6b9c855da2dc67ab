//! JSON-file-backed [`KvStore`].
//!
//! The whole ledger is a single small JSON document:
//!
//! ```json
//! {
//!   "entries": {
//!     "version-gate.last-migrated-version": {
//!       "value": "2.0",
//!       "updated_at": "2025-03-01T12:00:00+00:00"
//!     }
//!   }
//! }
//! ```
//!
//! Every [`set`](KvStore::set) rewrites the file through a sibling temp file
//! that is synced and then renamed over the original, so a crash mid-write
//! leaves either the old or the new ledger on disk, never a torn one.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use version_gate_core::KvStore;

use crate::error::{Result, StoreError};

/// A stored value with the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The stored string.
    pub value: String,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    entries: BTreeMap<String, StoredEntry>,
}

/// A [`KvStore`] persisted as a JSON file.
///
/// The file is read once by [`open`](Self::open); writes go straight to
/// disk. A missing file is an empty store and is created on first write,
/// along with any missing parent directories.
///
/// # Examples
///
/// ```no_run
/// use version_gate_core::MigrationGate;
/// use version_gate_store::FileStore;
///
/// let store = FileStore::open("/var/lib/myapp/migrations.json").unwrap();
/// let mut gate = MigrationGate::new(store, env!("CARGO_PKG_VERSION")).unwrap();
/// gate.run_if_due("0.1", || Ok(())).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    ledger: LedgerFile,
}

impl FileStore {
    /// Opens the ledger at `path`, reading it if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file exists but cannot be
    /// read, or [`StoreError::JsonError`] if it is not a valid ledger.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ledger = read_ledger(&path)?;
        debug!(path = %path.display(), entries = ledger.entries.len(), "Opened ledger file");
        Ok(Self { path, ledger })
    }

    /// Re-reads the file, discarding the in-memory copy.
    pub fn reload(&mut self) -> Result<()> {
        self.ledger = read_ledger(&self.path)?;
        Ok(())
    }

    /// Returns the entry stored under `key`, with its timestamp.
    pub fn entry(&self, key: &str) -> Option<&StoredEntry> {
        self.ledger.entries.get(key)
    }

    /// Iterates over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &StoredEntry)> {
        self.ledger.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.ledger.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.ledger.entries.is_empty()
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, ledger: &LedgerFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let result = write_and_rename(ledger, &tmp_path, &self.path);
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }
}

fn write_and_rename(ledger: &LedgerFile, tmp_path: &Path, path: &Path) -> Result<()> {
    let file = File::create(tmp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, ledger)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    std::fs::rename(tmp_path, path)?;
    Ok(())
}

impl KvStore for FileStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.ledger.entries.get(key).map(|e| e.value.clone()))
    }

    /// Writes the updated ledger to disk before updating the in-memory
    /// copy, so a failed write leaves the store unchanged.
    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let mut next = self.ledger.clone();
        match value {
            Some(value) => {
                next.entries.insert(
                    key.to_string(),
                    StoredEntry {
                        value: value.to_string(),
                        updated_at: Utc::now().to_rfc3339(),
                    },
                );
            }
            None => {
                if next.entries.remove(key).is_none() {
                    return Ok(());
                }
            }
        }

        self.persist(&next)?;
        debug!(path = %self.path.display(), key, value = ?value, "Wrote ledger file");
        self.ledger = next;
        Ok(())
    }
}

fn read_ledger(path: &Path) -> Result<LedgerFile> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LedgerFile::default()),
        Err(e) => return Err(e.into()),
    };
    let ledger = serde_json::from_reader(BufReader::new(file))?;
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("ledger.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_writes_through_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("k", Some("1.0")).unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("1.0"));
        let entry = reopened.entry("k").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.updated_at).is_ok());
    }

    #[test]
    fn test_clear_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("a", Some("1")).unwrap();
        store.set("b", Some("2")).unwrap();
        store.set("a", None).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.len(), 1);
        let keys: Vec<_> = reopened.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b"]);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut store = FileStore::open(&path).unwrap();
        store.set("k", Some("1")).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["ledger.json"]);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::JsonError(_))));
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut reader = FileStore::open(&path).unwrap();
        let mut writer = FileStore::open(&path).unwrap();
        writer.set("k", Some("9.9")).unwrap();

        assert_eq!(reader.get("k").unwrap(), None);
        reader.reload().unwrap();
        assert_eq!(reader.get("k").unwrap().as_deref(), Some("9.9"));
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("ledger.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let mut store = FileStore {
            path: path.clone(),
            ledger: LedgerFile::default(),
        };
        assert!(store.set("k", Some("1")).is_err());
        assert_eq!(store.get("k").unwrap(), None);
        assert!(!dir.path().join("ledger.json.tmp").exists());
    }
}
