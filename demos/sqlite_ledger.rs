//! Ledger stored in a SQLite database next to application tables.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p version-gate-demos --example sqlite_ledger
//! ```

use version_gate_core::{GateError, MigrationGate};
use version_gate_sqlite::SqliteStore;

fn main() {
    let dir = std::env::temp_dir().join("version_gate_sqlite_demo");
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("app.db");
    std::fs::remove_file(&db_path).ok();

    // === Step 1: First install at 1.0 ===
    println!("=== Install 1.0 ===");
    let store = SqliteStore::open(&db_path, "vg_").unwrap();
    let gate = MigrationGate::new(store, "1.0").unwrap();
    let status = gate.store().status().unwrap();
    println!("Table exists: {}, entries: {}", status.table_exists, status.entry_count);
    drop(gate);

    // === Step 2: Upgrade to 1.1 with a failing migration ===
    println!("\n=== Upgrade to 1.1 (first attempt) ===");
    let store = SqliteStore::open(&db_path, "vg_").unwrap();
    let mut gate = MigrationGate::new(store, "1.1").unwrap();
    match gate.run_if_due("1.1", || Err("network share unavailable".into())) {
        Err(e @ GateError::ActionFailed { .. }) => println!("  {e}"),
        other => panic!("expected failure, got {other:?}"),
    }
    println!("  ledger still at {}", gate.last_migrated_version().unwrap().unwrap());
    drop(gate);

    // === Step 3: Next launch retries ===
    println!("\n=== Upgrade to 1.1 (retry) ===");
    let store = SqliteStore::open(&db_path, "vg_").unwrap();
    let mut gate = MigrationGate::new(store, "1.1").unwrap();
    let outcome = gate
        .run_if_due("1.1", || {
            println!("  copying attachments");
            Ok(())
        })
        .unwrap();
    println!("  1.1: {outcome:?}");

    for entry in gate.store().entries().unwrap() {
        println!("  {} = {} ({})", entry.key, entry.value, entry.updated_at);
    }

    // Cleanup
    let mut store = gate.into_store();
    store.down().unwrap();
    std::fs::remove_dir_all(&dir).ok();
    println!("\nDone!");
}
