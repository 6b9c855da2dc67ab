//! Integration tests for the version-gate-sqlite crate.

use std::path::Path;

use rusqlite::Connection;
use version_gate_core::{
    GateError, KvStore, LAST_MIGRATED_VERSION_KEY, MigrationGate, MigrationOutcome,
};
use version_gate_sqlite::{SqliteError, SqliteStore};
use version_gate_store::GateConfig;

/// Simulates one app launch against the database file at `path`.
fn launch(path: &Path, app_version: &str) -> MigrationGate<SqliteStore> {
    let store = SqliteStore::open(path, "vg_").unwrap();
    MigrationGate::new(store, app_version).unwrap()
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");

    drop(launch(&path, "1.0"));

    let mut gate = launch(&path, "2.0");
    assert_eq!(
        gate.run_if_due("2.0", || Ok(())).unwrap(),
        MigrationOutcome::Executed
    );
    drop(gate);

    let mut gate = launch(&path, "2.0");
    assert_eq!(
        gate.run_if_due("2.0", || panic!("already migrated")).unwrap(),
        MigrationOutcome::Skipped
    );

    let entry = gate
        .store()
        .entries()
        .unwrap()
        .into_iter()
        .find(|e| e.key == LAST_MIGRATED_VERSION_KEY)
        .unwrap();
    assert_eq!(entry.value, "2.0");
    assert!(chrono::NaiveDateTime::parse_from_str(&entry.updated_at, "%Y-%m-%d %H:%M:%S").is_ok());
}

#[test]
fn test_failed_action_leaves_row_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    drop(launch(&path, "1.0"));

    let mut gate = launch(&path, "2.0");
    let err = gate
        .run_if_due("1.1", || Err(std::io::Error::other("locked").into()))
        .unwrap_err();
    assert!(matches!(err, GateError::ActionFailed { .. }));

    let store = SqliteStore::open(&path, "vg_").unwrap();
    assert_eq!(
        store.get(LAST_MIGRATED_VERSION_KEY).unwrap().as_deref(),
        Some("1.0")
    );
}

#[test]
fn test_prefixes_isolate_ledgers_in_one_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let mut a = SqliteStore::open(&path, "app_a_").unwrap();
    let b = SqliteStore::open(&path, "app_b_").unwrap();

    a.set("k", Some("1.0")).unwrap();
    assert_eq!(b.get("k").unwrap(), None);
    assert_eq!(a.status().unwrap().entry_count, 1);
    assert_eq!(b.status().unwrap().entry_count, 0);
}

#[test]
fn test_store_shares_connection_with_app_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")
        .unwrap();

    let store = SqliteStore::new(conn, "vg_").unwrap();
    let mut gate = MigrationGate::new(store, "1.0").unwrap();
    gate.reset().unwrap();

    gate.run_if_due("1.0", || Ok(())).unwrap();

    let conn = gate.into_store().into_connection();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type='table' AND name IN ('notes', 'vg_ledger')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 2);
}

#[test]
fn test_dropped_table_surfaces_as_store_error() {
    let mut store = SqliteStore::open_in_memory("vg_").unwrap();
    store.set(LAST_MIGRATED_VERSION_KEY, Some("1.0")).unwrap();
    let mut gate = MigrationGate::new(store, "2.0").unwrap();

    // Drop the table behind the gate's back.
    gate.store()
        .connection()
        .execute_batch("DROP TABLE vg_ledger;")
        .unwrap();

    match gate.run_if_due("2.0", || Ok(())) {
        Err(GateError::Store(source)) => {
            assert!(source.downcast_ref::<SqliteError>().is_some());
        }
        other => panic!("expected Store error, got {other:?}"),
    }
}

#[test]
fn test_config_opens_sqlite_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("state.db");
    let yaml = format!(
        "version: \"1.0\"\ndomain: search\napp_version: \"2.0\"\n\
         store:\n  kind: sqlite\n  path: {}\n  table_prefix: cfg_\n",
        db_path.display()
    );

    let config = GateConfig::from_yaml(&yaml).unwrap();
    let store = SqliteStore::from_config(&config.store).unwrap();
    assert_eq!(store.prefix(), "cfg_");

    let gate = config.gate_builder().build(store).unwrap();
    let entries = gate.store().entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "version-gate.last-migrated-version-search");
    assert_eq!(entries[0].value, "2.0");
}
