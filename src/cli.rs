//! CLI argument parsing for Strata
//!
//! Defines the Command enum and parse_args() function for all CLI commands.

use anyhow::Result;
use std::path::PathBuf;
use strata::OutputFormat;

pub fn print_usage() {
    eprintln!("Strata - failure analysis for legacy batch snapshots");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  strata <command> [arguments]");
    eprintln!("  strata --help");
    eprintln!();
    eprintln!("  strata scan <SNAPSHOT> [--include-logs]");
    eprintln!("  strata explain <SNAPSHOT> --log <FILE> [--job <ID>] [--rules <FILE>] [--debug] [--no-persist]");
    eprintln!("  strata search <SNAPSHOT> <QUERY> [--limit <N>] [--raw-fts]");
    eprintln!("  strata plan <SNAPSHOT> [--cid <CID>] [--job-id <ID>] [--title <TEXT>] [--all] [--json] [--structured-output] [--lang <en|ru>] [--limit <N>] [--debug]");
    eprintln!("  strata incidents <SNAPSHOT> [--limit <N>]");
    eprintln!("  strata import-codes <SNAPSHOT> --file <JSONL>");
    eprintln!("  strata import-cases <SNAPSHOT> --file <JSONL>");
    eprintln!("  strata status <SNAPSHOT> [--output <human|json>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  scan          Scan a snapshot and build its execution graph");
    eprintln!("  explain       Analyze a failing log and print a context pack");
    eprintln!("  search        Search indexed artifacts (paths and content)");
    eprintln!("  plan          Resolve an intent to a ranked job bundle");
    eprintln!("  incidents     List persisted analysis outcomes");
    eprintln!("  import-codes  Import a message-code listing (JSON Lines)");
    eprintln!("  import-cases  Import resolved case cards (JSON Lines)");
    eprintln!("  status        Show store statistics");
    eprintln!();
    eprintln!("Scan arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --include-logs      Also index the logs/ directory (slow)");
    eprintln!();
    eprintln!("Explain arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --log <FILE>        Log file to analyze (required)");
    eprintln!("  --job <ID>          Force a specific job key, bypassing scoring");
    eprintln!("  --rules <FILE>      Replace the built-in signal rules with a JSON file");
    eprintln!("  --debug             Show extracted tokens and candidate score breakdowns");
    eprintln!("  --no-persist        Skip writing the incident row");
    eprintln!();
    eprintln!("Search arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  <QUERY>             Search query");
    eprintln!("  --limit <N>         Maximum results (default: 20)");
    eprintln!("  --raw-fts           Pass the query to the full-text engine untouched");
    eprintln!();
    eprintln!("Plan arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --cid <CID>         Customer id (overrides the title-parsed value)");
    eprintln!("  --job-id <ID>       Job id suffix (e.g. ds1)");
    eprintln!("  --title <TEXT>      Free-form title to parse for intent");
    eprintln!("  --all               Show full detail for every candidate");
    eprintln!("  --json              Emit the machine-readable plan JSON");
    eprintln!("  --structured-output Emit a paste-ready prompt embedding the JSON");
    eprintln!("  --lang <en|ru>      Language for human-readable headings");
    eprintln!("  --limit <N>         Maximum candidates (default: 5)");
    eprintln!("  --debug             Show score breakdowns");
    eprintln!();
    eprintln!("Incidents arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --limit <N>         Maximum incidents to show (default: 20)");
    eprintln!();
    eprintln!("Import arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --file <JSONL>      Pre-extracted records, one JSON object per line");
    eprintln!();
    eprintln!("Status arguments:");
    eprintln!("  <SNAPSHOT>          Snapshot root directory");
    eprintln!("  --output <FORMAT>   Output format: human (default) or json");
}

pub enum Command {
    Scan {
        snapshot: PathBuf,
        include_logs: bool,
    },
    Explain {
        snapshot: PathBuf,
        log: PathBuf,
        job: Option<String>,
        rules: Option<PathBuf>,
        debug: bool,
        persist: bool,
    },
    Search {
        snapshot: PathBuf,
        query: String,
        limit: usize,
        raw_fts: bool,
    },
    Plan {
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
    },
    Incidents {
        snapshot: PathBuf,
        limit: usize,
    },
    ImportCodes {
        snapshot: PathBuf,
        file: PathBuf,
    },
    ImportCases {
        snapshot: PathBuf,
        file: PathBuf,
    },
    Status {
        snapshot: PathBuf,
        output_format: OutputFormat,
    },
}

/// Take the positional argument at `args[i]`, failing on flags
fn positional(args: &[String], i: usize, what: &str) -> Result<String> {
    match args.get(i) {
        Some(arg) if !arg.starts_with("--") => Ok(arg.clone()),
        _ => Err(anyhow::anyhow!("missing {what} argument")),
    }
}

/// Parse CLI arguments into a Command
///
/// For the --version and -V flags, it prints the version and exits.
/// For the --help and -h flags, it prints usage and exits.
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    if command == "--version" || command == "-V" {
        println!("{}", strata::version::version());
        std::process::exit(0);
    }

    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    match command.as_str() {
        "scan" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut include_logs = false;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--include-logs" => {
                        include_logs = true;
                        i += 1;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            Ok(Command::Scan {
                snapshot,
                include_logs,
            })
        }
        "explain" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut log: Option<PathBuf> = None;
            let mut job: Option<String> = None;
            let mut rules: Option<PathBuf> = None;
            let mut debug = false;
            let mut persist = true;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--log" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--log requires an argument"));
                        }
                        log = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    "--job" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--job requires an argument"));
                        }
                        job = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--rules" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--rules requires an argument"));
                        }
                        rules = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    "--debug" => {
                        debug = true;
                        i += 1;
                    }
                    "--no-persist" => {
                        persist = false;
                        i += 1;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            let log = log.ok_or_else(|| anyhow::anyhow!("--log is required"))?;

            Ok(Command::Explain {
                snapshot,
                log,
                job,
                rules,
                debug,
                persist,
            })
        }
        "search" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let query = positional(&args, 3, "query")?;
            let mut limit = 20;
            let mut raw_fts = false;

            let mut i = 4;
            while i < args.len() {
                match args[i].as_str() {
                    "--limit" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--limit requires an argument"));
                        }
                        limit = args[i + 1].parse()?;
                        i += 2;
                    }
                    "--raw-fts" => {
                        raw_fts = true;
                        i += 1;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            Ok(Command::Search {
                snapshot,
                query,
                limit,
                raw_fts,
            })
        }
        "plan" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut cid: Option<String> = None;
            let mut job_id: Option<String> = None;
            let mut title: Option<String> = None;
            let mut all = false;
            let mut json = false;
            let mut structured_output = false;
            let mut lang = "en".to_string();
            let mut limit = 5;
            let mut debug = false;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--cid" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--cid requires an argument"));
                        }
                        cid = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--job-id" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--job-id requires an argument"));
                        }
                        job_id = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--title" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--title requires an argument"));
                        }
                        title = Some(args[i + 1].clone());
                        i += 2;
                    }
                    "--all" => {
                        all = true;
                        i += 1;
                    }
                    "--json" => {
                        json = true;
                        i += 1;
                    }
                    "--structured-output" => {
                        structured_output = true;
                        i += 1;
                    }
                    "--lang" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--lang requires an argument"));
                        }
                        lang = args[i + 1].clone();
                        i += 2;
                    }
                    "--limit" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--limit requires an argument"));
                        }
                        limit = args[i + 1].parse()?;
                        i += 2;
                    }
                    "--debug" => {
                        debug = true;
                        i += 1;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            if cid.is_none() && job_id.is_none() && title.is_none() {
                return Err(anyhow::anyhow!(
                    "plan needs at least one of --cid, --job-id, --title"
                ));
            }

            Ok(Command::Plan {
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
            })
        }
        "incidents" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut limit = 20;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--limit" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--limit requires an argument"));
                        }
                        limit = args[i + 1].parse()?;
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            Ok(Command::Incidents { snapshot, limit })
        }
        "import-codes" | "import-cases" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut file: Option<PathBuf> = None;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--file" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--file requires an argument"));
                        }
                        file = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            let file = file.ok_or_else(|| anyhow::anyhow!("--file is required"))?;

            if command == "import-codes" {
                Ok(Command::ImportCodes { snapshot, file })
            } else {
                Ok(Command::ImportCases { snapshot, file })
            }
        }
        "status" => {
            let snapshot = PathBuf::from(positional(&args, 2, "snapshot")?);
            let mut output_format = OutputFormat::Human;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" => {
                        if i + 1 >= args.len() {
                            return Err(anyhow::anyhow!("--output requires an argument"));
                        }
                        output_format = OutputFormat::parse(&args[i + 1]).ok_or_else(|| {
                            anyhow::anyhow!(
                                "Invalid output format: {}. Must be human or json",
                                args[i + 1]
                            )
                        })?;
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            Ok(Command::Status {
                snapshot,
                output_format,
            })
        }
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}
