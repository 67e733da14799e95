//! Scan command implementation for Strata

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use strata::graph::{scan_snapshot, ScanOptions};
use strata::Store;

/// Run a snapshot scan
///
/// Usage: strata scan <SNAPSHOT> [--include-logs]
pub fn run_scan(snapshot: PathBuf, include_logs: bool) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;

    println!("Scanning snapshot: {}", snapshot.display());
    println!("Database: {}", strata::config::db_path(&snapshot).display());

    let store = Store::open_snapshot(&snapshot)?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let progress = |current: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(current as u64);
    };

    let stats = scan_snapshot(
        &store,
        &snapshot,
        &ScanOptions { include_logs },
        Some(&progress),
    )?;
    bar.finish_and_clear();

    println!();
    println!("Scan complete");
    println!("  Files scanned: {}", stats.files_scanned);
    println!("  Files with content: {}", stats.files_stored);
    println!("  Unchanged (skipped): {}", stats.unchanged);
    println!("  Jobs parsed: {}", stats.jobs_parsed);
    println!("  Nodes created: {}", stats.nodes_created);
    println!("  Edges created: {}", stats.edges_created);
    if stats.parse_errors > 0 {
        println!("  Errors (skipped files): {}", stats.parse_errors);
    }

    Ok(())
}
