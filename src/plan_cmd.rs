//! Plan command implementation for Strata

use anyhow::{bail, Result};
use std::path::PathBuf;

use strata::analysis::generate_plan;
use strata::output::plan as plan_output;
use strata::Store;

/// Run the bundle planner
///
/// Usage: strata plan <SNAPSHOT> [--cid <CID>] [--job-id <ID>] [--title <TEXT>] ...
#[allow(clippy::too_many_arguments)]
pub fn run_plan(
    snapshot: PathBuf,
    cid: Option<String>,
    job_id: Option<String>,
    title: Option<String>,
    all: bool,
    json: bool,
    structured_output: bool,
    lang: String,
    limit: usize,
    debug: bool,
) -> Result<()> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;
    if !strata::config::db_path(&snapshot).is_file() {
        bail!("database not found, run 'strata scan' first");
    }

    let store = Store::open_snapshot(&snapshot)?;
    let plan = generate_plan(
        &store,
        cid.as_deref(),
        job_id.as_deref(),
        title.as_deref(),
        limit,
    )?;

    if json {
        let value = plan_output::format_json(&plan, &snapshot);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if structured_output {
        println!("{}", plan_output::format_structured_prompt(&plan, &snapshot));
    } else {
        println!("{}", plan_output::format_text(&plan, &snapshot, all, debug, &lang));
    }

    Ok(())
}
