//! Status command implementation for Strata

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use strata::output::{generate_execution_id, output_json, JsonResponse, OutputFormat};
use strata::Store;

/// Response for the status command
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub artifacts: BTreeMap<String, i64>,
    pub nodes: BTreeMap<String, i64>,
    pub edges: BTreeMap<String, i64>,
    pub jobs: i64,
    pub message_codes: i64,
    pub case_cards: i64,
    pub incidents: i64,
}

/// Run the status query
///
/// Usage: strata status <SNAPSHOT> [--output <human|json>]
pub fn run_status(snapshot: PathBuf, output_format: OutputFormat) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;
    if !strata::config::db_path(&snapshot).is_file() {
        bail!("database not found, run 'strata scan' first");
    }

    let store = Store::open_snapshot(&snapshot)?;
    let response = StatusResponse {
        artifacts: store.count_artifacts_by_kind()?.into_iter().collect(),
        nodes: store.count_nodes_by_type()?.into_iter().collect(),
        edges: store.count_edges_by_type()?.into_iter().collect(),
        jobs: store.count_jobs()?,
        message_codes: store.count_message_codes()?,
        case_cards: store.count_case_cards()?,
        incidents: store.count_incidents()?,
    };

    match output_format {
        OutputFormat::Json => {
            let exec_id = generate_execution_id();
            output_json(&JsonResponse::new(response, &exec_id))?;
        }
        OutputFormat::Human => {
            println!("Snapshot statistics: {}", snapshot.display());
            println!();
            println!("Artifacts:");
            for (kind, count) in &response.artifacts {
                println!("  {}: {}", kind, count);
            }
            println!("Nodes:");
            for (node_type, count) in &response.nodes {
                println!("  {}: {}", node_type, count);
            }
            println!("Edges:");
            for (rel_type, count) in &response.edges {
                println!("  {}: {}", rel_type, count);
            }
            println!("Other:");
            println!("  jobs parsed: {}", response.jobs);
            println!("  message codes: {}", response.message_codes);
            println!("  case cards: {}", response.case_cards);
            println!("  incidents: {}", response.incidents);
        }
    }

    Ok(())
}
