//! Import commands for the message-code knowledge base and case history
//!
//! Heavy extraction (PDF text, session transcripts) happens outside this
//! tool; these commands ingest the pre-extracted records as JSON Lines.
//! Both imports are idempotent: codes upsert by code, case cards dedupe by
//! content hash, so re-running an import on unchanged input is a no-op.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use strata::hashing::content_hash;
use strata::parse::Severity;
use strata::store::{CaseCardRecord, MessageCode};
use strata::Store;

/// One line of a code-listing import file
#[derive(Debug, Deserialize)]
struct CodeLine {
    code: String,
    #[serde(default)]
    title: Option<String>,
    body: String,
    #[serde(default)]
    source: Option<String>,
}

/// One line of a case-card import file
#[derive(Debug, Deserialize)]
struct CaseLine {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    signals: Vec<String>,
    #[serde(default)]
    root_cause: Option<String>,
    #[serde(default)]
    fix_summary: Option<String>,
    #[serde(default)]
    verify_commands: Vec<String>,
    #[serde(default)]
    related_files: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn open_store(snapshot: &PathBuf) -> Result<(PathBuf, Store)> {
    if !snapshot.is_dir() {
        bail!("snapshot path does not exist: {}", snapshot.display());
    }
    let snapshot = snapshot.canonicalize()?;
    let store = Store::open_snapshot(&snapshot)?;
    Ok((snapshot, store))
}

/// Import a message-code listing
///
/// Usage: strata import-codes <SNAPSHOT> --file <JSONL>
pub fn run_import_codes(snapshot: PathBuf, file: PathBuf) -> Result<()> {
    let (_snapshot, store) = open_store(&snapshot)?;
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let source_default = file.display().to_string();

    let mut stored = 0usize;
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: CodeLine = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("{}:{}: bad record: {}", file.display(), idx + 1, err);
                skipped += 1;
                continue;
            }
        };
        // Severity is encoded in the code's trailing letter; parse it once
        // here, never again downstream
        let Some(severity) = Severity::from_code(&record.code) else {
            log::warn!(
                "{}:{}: code '{}' has no severity letter",
                file.display(),
                idx + 1,
                record.code
            );
            skipped += 1;
            continue;
        };
        store.upsert_message_code(&MessageCode {
            code: record.code,
            severity,
            title: record.title,
            body: record.body,
            source_path: record.source.unwrap_or_else(|| source_default.clone()),
        })?;
        stored += 1;
    }

    println!("Import complete");
    println!("  Codes stored/updated: {}", stored);
    if skipped > 0 {
        println!("  Skipped (bad records): {}", skipped);
    }
    println!("  Total codes in database: {}", store.count_message_codes()?);

    Ok(())
}

/// Import resolved case cards
///
/// Usage: strata import-cases <SNAPSHOT> --file <JSONL>
pub fn run_import_cases(snapshot: PathBuf, file: PathBuf) -> Result<()> {
    let (_snapshot, store) = open_store(&snapshot)?;
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    let mut inserted = 0usize;
    let mut unchanged = 0usize;
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: CaseLine = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("{}:{}: bad record: {}", file.display(), idx + 1, err);
                skipped += 1;
                continue;
            }
        };
        if record.signals.is_empty() && record.root_cause.is_none() {
            // A card with neither signals nor a cause can never match
            skipped += 1;
            continue;
        }
        let (_, was_inserted) = store.upsert_case_card(&CaseCardRecord {
            content_hash: content_hash(line),
            source_path: record.source,
            title: record.title,
            signals: record.signals,
            root_cause: record.root_cause,
            fix_summary: record.fix_summary,
            verify_commands: record.verify_commands,
            related_files: record.related_files,
            tags: record.tags,
        })?;
        if was_inserted {
            inserted += 1;
        } else {
            unchanged += 1;
        }
    }

    println!("Import complete");
    println!("  Inserted: {}", inserted);
    println!("  Unchanged (already imported): {}", unchanged);
    if skipped > 0 {
        println!("  Skipped (bad or empty records): {}", skipped);
    }
    println!("  Total case cards in database: {}", store.count_case_cards()?);

    Ok(())
}
