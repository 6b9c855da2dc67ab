//! Config-driven ledger stored in a JSON file.
//!
//! Writes a YAML config into a temporary directory, loads it, and runs two
//! named ledgers against the same ledger file.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p version-gate-demos --example file_ledger
//! ```

use version_gate_core::{MigrationGate, MigrationOutcome};
use version_gate_store::{FileStore, GateConfig};

fn main() {
    // === Step 1: Write a config file ===
    let dir = std::env::temp_dir().join("version_gate_file_ledger_demo");
    std::fs::create_dir_all(&dir).unwrap();
    let ledger_path = dir.join("ledger.json");
    let config_path = dir.join("gate.yml");
    std::fs::remove_file(&ledger_path).ok();

    let yaml = format!(
        "version: \"1.0\"\ndomain: thumbnails\nstore:\n  kind: file\n  path: {}\n",
        ledger_path.display()
    );
    std::fs::write(&config_path, yaml).unwrap();

    let config = GateConfig::load(&config_path).unwrap();

    // An earlier install of 2.0 seeded the ledger.
    config
        .gate_builder()
        .current_version("2.0")
        .build(config.open_file_store().unwrap())
        .unwrap();

    // === Step 2: Upgrade to 3.0 ===
    println!("=== Configured ledger ===");
    let store = config.open_file_store().unwrap();
    let mut gate = config
        .gate_builder()
        .app_version_provider(|| Some("3.0".to_string()))
        .build(store)
        .unwrap();
    println!("Key: {}", gate.storage_key());

    let outcome = gate
        .run_if_due("3.0", || {
            println!("  regenerating thumbnails");
            Ok(())
        })
        .unwrap();
    println!("3.0: {outcome:?}");

    // === Step 3: A second, independent ledger in the same file ===
    println!("\n=== Second ledger ===");
    let store = FileStore::open(&ledger_path).unwrap();
    let mut search = MigrationGate::builder()
        .domain("search")
        .current_version("3.0")
        .build(store)
        .unwrap();
    let outcome = search.run_if_due("3.0", || Ok(())).unwrap();
    assert_eq!(outcome, MigrationOutcome::Skipped);
    println!("search 3.0: {outcome:?} (fresh ledger seeded at 3.0)");

    // === Step 4: Inspect the file ===
    println!("\n=== Ledger file ===");
    let store = FileStore::open(&ledger_path).unwrap();
    for (key, entry) in store.entries() {
        println!("  {key} = {} (updated {})", entry.value, entry.updated_at);
    }

    // Cleanup
    std::fs::remove_dir_all(&dir).ok();
    println!("\nDone!");
}
