//! Explain command implementation for Strata
//!
//! Parses the log, matches it against the graph, ranks hypotheses, finds
//! similar past cases, persists the incident, and prints the context pack
//! as a single block.

use anyhow::{bail, Result};
use std::path::PathBuf;

use strata::analysis::{run_explain, ExplainOptions};
use strata::graph::matching::format_debug_candidates;
use strata::graph::MatchOutcome;
use strata::output::context_pack;
use strata::Store;

/// Run a log analysis
///
/// Usage: strata explain <SNAPSHOT> --log <FILE> [--job <ID>] [--debug] [--no-persist]
pub fn run_explain_cmd(
    snapshot: PathBuf,
    log: PathBuf,
    job: Option<String>,
    rules: Option<PathBuf>,
    debug: bool,
    persist: bool,
) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    if !log.is_file() {
        bail!("log file does not exist: {}", log.display());
    }
    let snapshot = snapshot.canonicalize()?;
    let log = log.canonicalize()?;

    if !strata::config::db_path(&snapshot).is_file() {
        bail!("database not found, run 'strata scan' first");
    }
    let store = Store::open_snapshot(&snapshot)?;

    let report = run_explain(
        &store,
        &snapshot,
        &log,
        &ExplainOptions {
            forced_job: job,
            persist,
            rules_path: rules,
        },
    )?;

    if debug {
        eprintln!("Extracted from log:");
        eprintln!("  PREFIX tokens: {:?}", report.analysis.prefix_tokens);
        eprintln!("  JID tokens:    {:?}", report.analysis.jid_tokens);
        eprintln!("  Script paths:  {:?}", report.analysis.script_paths);
        eprintln!("  Error codes:   {:?}", report.analysis.error_codes);
        eprintln!("  DOCDEF tokens: {:?}", report.analysis.docdef_tokens);
        if let MatchOutcome::Match { candidates } = &report.outcome {
            eprintln!("{}", format_debug_candidates(candidates));
        } else {
            eprintln!("(no candidate scored above zero)");
        }
    }

    // Single block, no extra commentary: the pack is pasted downstream
    println!("{}", context_pack::render(&report, &log, &snapshot));

    Ok(())
}
