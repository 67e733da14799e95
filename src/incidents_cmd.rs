//! Incidents command implementation for Strata

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use strata::Store;

/// List persisted analysis outcomes
///
/// Usage: strata incidents <SNAPSHOT> [--limit <N>]
pub fn run_incidents(snapshot: PathBuf, limit: usize) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;
    if !strata::config::db_path(&snapshot).is_file() {
        bail!("database not found, run 'strata scan' first");
    }

    let store = Store::open_snapshot(&snapshot)?;
    let total = store.count_incidents()?;
    let incidents = store.list_incidents(limit)?;

    if incidents.is_empty() {
        println!("No incidents recorded.");
        println!("Run 'strata explain <snapshot> --log <logfile>' to analyze a log.");
        return Ok(());
    }

    println!("Recent incidents ({} of {}):", incidents.len(), total);
    println!();
    for incident in incidents {
        let log_name = Path::new(&incident.log_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| incident.log_path.clone());
        let node = incident.top_node_key.as_deref().unwrap_or("no confident match");
        let confidence = incident
            .confidence
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "?".to_string());
        let analyzed = incident.updated_at.as_deref().unwrap_or(&incident.created_at);

        println!("{}", log_name);
        println!("  Node: {} ({} confidence)", node, confidence);
        println!("  Analyzed: {}", analyzed);
        println!();
    }

    Ok(())
}
