//! Search command implementation for Strata

use anyhow::{bail, Result};
use std::path::PathBuf;

use strata::Store;

/// Run an artifact search
///
/// Usage: strata search <SNAPSHOT> <QUERY> [--limit <N>] [--raw-fts]
pub fn run_search(snapshot: PathBuf, query: String, limit: usize, raw_fts: bool) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;
    if !strata::config::db_path(&snapshot).is_file() {
        bail!("database not found, run 'strata scan' first");
    }

    let store = Store::open_snapshot(&snapshot)?;
    let (hits, method) = store.full_text_search(&query, limit, raw_fts)?;

    if hits.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for: {} [method: {}]", hits.len(), query, method);
    println!();
    for hit in hits {
        println!("{} [{}]", hit.path, hit.kind);
        if let Some(snippet) = hit.snippet {
            let snippet: String = snippet.replace('\n', " ").chars().take(100).collect();
            println!("  {}", snippet);
        }
        println!();
    }

    Ok(())
}
