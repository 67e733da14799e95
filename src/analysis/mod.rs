//! Analysis pipeline: parse -> signal scan -> match -> rank -> similarity -> persist
//!
//! The stages of one `explain` run are causally ordered and none overlaps;
//! different logs can be analyzed in parallel against the same graph because
//! every stage here only reads it.

pub mod hypotheses;
pub mod planner;
pub mod similarity;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{MAX_HYPOTHESES, SIMILARITY_THRESHOLD, SIMILAR_CASES_LIMIT};
use crate::graph::{match_log, MatchOutcome};
use crate::parse::{analyze_log, LogAnalysis, Severity};
use crate::rules::{ExternalSignal, RuleSet};
use crate::store::{EdgeNeighbor, IncidentRecord, MessageCode, Store};

pub use hypotheses::{rank_hypotheses, Hypothesis, HypothesisTier};
pub use planner::{generate_plan, BundleCandidate, BundleFile, Plan, PlanIntent};
pub use similarity::{find_similar_cases, jaccard, SimilarCase};

/// Options for one explain run
#[derive(Debug, Default)]
pub struct ExplainOptions {
    /// Operator override: force this job key, bypassing scoring
    pub forced_job: Option<String>,
    /// Persist the outcome as an incident (on by default)
    pub persist: bool,
    /// Replacement rules file; the built-in set is used when absent
    pub rules_path: Option<PathBuf>,
}

/// Everything one analysis run produced
#[derive(Debug)]
pub struct ExplainReport {
    pub analysis: LogAnalysis,
    pub signals: Vec<ExternalSignal>,
    pub outcome: MatchOutcome,
    pub decoded: BTreeMap<String, MessageCode>,
    pub hypotheses: Vec<Hypothesis>,
    pub similar_cases: Vec<SimilarCase>,
    /// Nodes pointing at the matched node and nodes it points at
    pub upstream: Vec<EdgeNeighbor>,
    pub downstream: Vec<EdgeNeighbor>,
    /// Snapshot files worth opening, existing on disk, bounded
    pub related_files: Vec<String>,
}

/// Run the full analysis pipeline for one log file.
///
/// Rule configuration is validated before the log is even read: a malformed
/// rule set is a configuration error, not an analysis outcome.
pub fn run_explain(
    store: &Store,
    snapshot: &Path,
    log_path: &Path,
    options: &ExplainOptions,
) -> Result<ExplainReport> {
    let rules = match &options.rules_path {
        Some(path) => RuleSet::load_file(path)?,
        None => RuleSet::load_default()?,
    };

    let text = std::fs::read_to_string(log_path)
        .with_context(|| format!("cannot read log file {}", log_path.display()))?;

    let mut analysis = analyze_log(&text, &log_path.display().to_string());
    let signals = rules.evaluate(&text);

    // Fatal external signals count as strong failure evidence (they point at
    // configuration or an external system, not at the wrapper)
    if signals.iter().any(|s| s.severity == Severity::Fatal) {
        analysis.has_strong_failure = true;
    }

    let outcome = match_log(store, &analysis, log_path, options.forced_job.as_deref())?;

    let decoded = store.message_codes_batch(&analysis.error_codes)?;
    let hypotheses = rank_hypotheses(&signals, &decoded, &analysis, MAX_HYPOTHESES);

    let mut target: BTreeSet<String> = analysis
        .error_codes
        .iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();
    target.extend(signals.iter().map(|s| s.rule_id.to_ascii_lowercase()));
    let similar_cases =
        find_similar_cases(store, &target, SIMILAR_CASES_LIMIT, SIMILARITY_THRESHOLD)?;

    let (upstream, downstream, related_files) = match outcome.top() {
        Some(top) => {
            let upstream = store.edges_to(top.node.id)?;
            let downstream = store.edges_from(top.node.id)?;
            let related = collect_related_files(snapshot, &top.node.canonical_path, &downstream);
            (upstream, downstream, related)
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let report = ExplainReport {
        analysis,
        signals,
        outcome,
        decoded,
        hypotheses,
        similar_cases,
        upstream,
        downstream,
        related_files,
    };

    if options.persist {
        persist_incident(store, log_path, &report)?;
    }

    Ok(report)
}

/// Files worth opening: the node's own artifact plus downstream artifacts
/// that exist in the snapshot, bounded to 10
fn collect_related_files(
    snapshot: &Path,
    canonical: &Option<String>,
    downstream: &[EdgeNeighbor],
) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    let mut push = |rel: &str, files: &mut Vec<String>| {
        if snapshot.join(rel).is_file() && !files.iter().any(|f| f == rel) {
            files.push(rel.to_string());
        }
    };

    if let Some(rel) = canonical {
        push(rel, &mut files);
    }
    for edge in downstream {
        if let Some(rel) = &edge.node.canonical_path {
            push(rel, &mut files);
        }
    }
    files.truncate(10);
    files
}

/// The Incident Recorder: upsert the run's outcome keyed by log path
fn persist_incident(store: &Store, log_path: &Path, report: &ExplainReport) -> Result<()> {
    let hypotheses_json = serde_json::to_string(
        &report
            .hypotheses
            .iter()
            .map(|h| {
                serde_json::json!({
                    "hypothesis": h.text,
                    "confidence": h.confidence,
                    "line_number": h.line_number,
                })
            })
            .collect::<Vec<_>>(),
    )?;

    let similar_json = if report.similar_cases.is_empty() {
        None
    } else {
        Some(serde_json::to_string(
            &report
                .similar_cases
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "case_id": c.case_id,
                        "title": c.title,
                        "score": c.score,
                    })
                })
                .collect::<Vec<_>>(),
        )?)
    };

    let analysis_json = serde_json::to_string(&report.analysis)?;

    let (top_key, confidence) = match report.outcome.top() {
        Some(top) => (Some(top.node.key.clone()), Some(top.confidence)),
        None => (None, None),
    };

    store.upsert_incident(&IncidentRecord {
        log_path: &log_path.display().to_string(),
        top_node_key: top_key.as_deref(),
        confidence,
        hypotheses_json: Some(&hypotheses_json),
        similar_cases_json: similar_json.as_deref(),
        analysis_json: Some(&analysis_json),
    })?;

    Ok(())
}
