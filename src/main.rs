//! Strata CLI - deterministic failure analysis for legacy batch snapshots
//!
//! Usage: strata <command> [arguments]

mod cli;
mod explain_cmd;
mod import_cmd;
mod incidents_cmd;
mod plan_cmd;
mod scan_cmd;
mod search_cmd;
mod status_cmd;

use std::process::ExitCode;

use cli::{parse_args, print_usage, Command};

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scan {
            snapshot,
            include_logs,
        } => scan_cmd::run_scan(snapshot, include_logs),
        Command::Explain {
            snapshot,
            log,
            job,
            rules,
            debug,
            persist,
        } => explain_cmd::run_explain_cmd(snapshot, log, job, rules, debug, persist),
        Command::Search {
            snapshot,
            query,
            limit,
            raw_fts,
        } => search_cmd::run_search(snapshot, query, limit, raw_fts),
        Command::Plan {
            snapshot,
            cid,
            job_id,
            title,
            all,
            json,
            structured_output,
            lang,
            limit,
            debug,
        } => plan_cmd::run_plan(
            snapshot,
            cid,
            job_id,
            title,
            all,
            json,
            structured_output,
            lang,
            limit,
            debug,
        ),
        Command::Incidents { snapshot, limit } => incidents_cmd::run_incidents(snapshot, limit),
        Command::ImportCodes { snapshot, file } => import_cmd::run_import_codes(snapshot, file),
        Command::ImportCases { snapshot, file } => import_cmd::run_import_cases(snapshot, file),
        Command::Status {
            snapshot,
            output_format,
        } => status_cmd::run_status(snapshot, output_format),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let command = match parse_args() {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
