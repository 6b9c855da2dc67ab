//! Startup migration pass with an in-memory ledger.
//!
//! Walks one simulated install through three releases and shows which
//! migrations fire at each launch, plus what the gate reports for common
//! integration mistakes.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p version-gate-demos --example startup_migrations
//! ```

use version_gate_core::{GateError, KvStore, MemoryStore, MigrationGate, MigrationOutcome};

/// The app's migrations, in declaration order.
const MIGRATIONS: &[(&str, &str)] = &[
    ("1.0", "create settings file"),
    ("1.2", "move cache to XDG cache dir"),
    ("2.0", "convert bookmarks to JSON"),
    ("2.0.1", "rebuild search index"),
    ("2.1", "drop legacy thumbnails"),
];

fn main() {
    let mut store = MemoryStore::new();

    // === Launches across releases ===
    for app_version in ["1.2", "1.2", "2.0", "2.1"] {
        println!("=== Launch {app_version} ===");
        let mut gate = MigrationGate::new(&mut store, app_version).unwrap();
        startup(&mut gate);
    }

    // === Integration mistakes are errors, not silent no-ops ===
    println!("\n=== Mistakes ===");
    let mut gate = MigrationGate::new(&mut store, "2.1").unwrap();
    for version in ["2.0", "1.9", "3.0", "2.1.x"] {
        match gate.run_if_due(version, || Ok(())) {
            Ok(outcome) => println!("  {version}: {outcome:?}"),
            Err(e @ GateError::OutOfOrderDeclaration { .. })
            | Err(e @ GateError::MigrationAheadOfApp { .. })
            | Err(e @ GateError::InvalidFormat(_)) => println!("  {version}: {e}"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    // === Reset ===
    println!("\n=== Reset ===");
    gate.reset().unwrap();
    drop(gate);
    let gate = MigrationGate::new(&mut store, "2.1").unwrap();
    let ledger = gate.last_migrated_version().unwrap().unwrap();
    println!("Ledger after reset and relaunch: {ledger}");
}

fn startup<S: KvStore>(gate: &mut MigrationGate<S>) {
    for (version, description) in MIGRATIONS {
        let result = gate.run_if_due(version, || {
            println!("  running {version}: {description}");
            Ok(())
        });
        match result {
            Ok(MigrationOutcome::Executed) | Ok(MigrationOutcome::Skipped) => {}
            // Declared for a later release than the one running.
            Err(GateError::MigrationAheadOfApp { .. }) => break,
            Err(e) => panic!("migration {version} failed: {e}"),
        }
    }
    println!("  ledger: {}", gate.last_migrated_version().unwrap().unwrap());
}
