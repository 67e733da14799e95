//! Log-to-node matching engine
//!
//! Scores every job node against the parsed log facts and returns ranked
//! candidates with confidence. Scoring is a pure function of the analysis
//! and the graph snapshot; identical inputs always produce identical output.
//!
//! Weights (additive, per candidate job node):
//! - prefix token equals the node key: +50
//! - an extracted script path is the target of a RUNS edge: +30
//! - an extracted document-definition token is reachable downstream
//!   (RUNS/READS/REFERS_TO, any depth): +20
//! - the log file name's tokens overlap the node's display name or
//!   canonical path: +10 scaled by the overlap fraction
//!
//! Confidence is score / 110 (the sum of all weights), capped at 1.0.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::config::{
    MATCH_MAX_SCORE, MATCH_WEIGHT_DOCDEF, MATCH_WEIGHT_FILENAME, MATCH_WEIGHT_PREFIX,
    MATCH_WEIGHT_SCRIPT,
};
use crate::parse::LogAnalysis;
use crate::store::{NodeRow, NodeType, Store, StoreResult};

/// How many candidates are retained for debug output
const DEBUG_CANDIDATES: usize = 10;

/// A scored candidate with its per-strategy breakdown
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub node: NodeRow,
    pub score: f64,
    pub confidence: f64,
    pub breakdown: Vec<(String, f64)>,
    pub edge_count: usize,
}

/// Outcome of matching one log against the graph
#[derive(Debug)]
pub enum MatchOutcome {
    /// At least one node scored above zero; candidates are ranked best-first
    Match { candidates: Vec<MatchCandidate> },
    /// No node scored above zero; an explicit result, not an error
    NoConfidentMatch,
}

impl MatchOutcome {
    pub fn top(&self) -> Option<&MatchCandidate> {
        match self {
            MatchOutcome::Match { candidates } => candidates.first(),
            MatchOutcome::NoConfidentMatch => None,
        }
    }
}

/// Tokenize a name/path into lowercase alphanumeric words
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Collect docdef node keys reachable downstream of a node via
/// RUNS/READS/REFERS_TO edges, any depth
fn reachable_docdefs(store: &Store, start: i64) -> StoreResult<BTreeSet<String>> {
    let mut docdefs = BTreeSet::new();
    let mut visited: HashSet<i64> = HashSet::new();
    let mut queue = vec![start];

    while let Some(node_id) = queue.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        for edge in store.edges_from(node_id)? {
            if edge.rel_type == "CALLS" {
                continue;
            }
            if edge.node.node_type == "docdef" {
                docdefs.insert(edge.node.key.to_ascii_uppercase());
            }
            queue.push(edge.node.id);
        }
    }

    Ok(docdefs)
}

/// Match a parsed log against the job nodes of the graph.
///
/// `forced_job` bypasses scoring entirely (operator override): an exact key
/// match yields confidence 1.0, a key-prefix match 0.9.
pub fn match_log(
    store: &Store,
    analysis: &LogAnalysis,
    log_path: &Path,
    forced_job: Option<&str>,
) -> StoreResult<MatchOutcome> {
    if let Some(forced) = forced_job {
        return match_forced(store, forced);
    }

    let log_tokens = log_path
        .file_stem()
        .map(|stem| tokenize(&stem.to_string_lossy()))
        .unwrap_or_default();

    let script_basenames: BTreeSet<String> = analysis
        .script_paths
        .iter()
        .filter_map(|p| Path::new(p).file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    let mut candidates: Vec<MatchCandidate> = Vec::new();

    for node in store.nodes_by_type(NodeType::Job)? {
        let mut breakdown: Vec<(String, f64)> = Vec::new();
        let edges = store.edges_from(node.id)?;

        // Strategy 1: prefix token equals the node key
        if let Some(token) = analysis.prefix_tokens.iter().find(|t| **t == node.key) {
            breakdown.push((format!("prefix_token:{token}"), MATCH_WEIGHT_PREFIX));
        }

        // Strategy 2: extracted script path is a RUNS target of this node
        let runs_hit = edges.iter().find(|edge| {
            edge.rel_type == "RUNS"
                && (analysis
                    .script_paths
                    .iter()
                    .any(|p| edge.node.original_path.as_deref() == Some(p.as_str()))
                    || script_basenames.contains(&edge.node.key))
        });
        if let Some(edge) = runs_hit {
            breakdown.push((format!("script:{}", edge.node.key), MATCH_WEIGHT_SCRIPT));
        }

        // Strategy 3: a docdef token reachable via downstream edges
        if !analysis.docdef_tokens.is_empty() {
            let reachable = reachable_docdefs(store, node.id)?;
            if let Some(token) = analysis
                .docdef_tokens
                .iter()
                .find(|t| reachable.contains(&t.to_ascii_uppercase()))
            {
                breakdown.push((format!("docdef:{token}"), MATCH_WEIGHT_DOCDEF));
            }
        }

        // Strategy 4: log file name token overlap, scaled by fraction
        if !log_tokens.is_empty() {
            let mut node_tokens = tokenize(&node.display_name);
            if let Some(canonical) = &node.canonical_path {
                node_tokens.extend(tokenize(canonical));
            }
            node_tokens.insert(node.key.to_ascii_lowercase());
            let matched = log_tokens.intersection(&node_tokens).count();
            if matched > 0 {
                let fraction = matched as f64 / log_tokens.len() as f64;
                breakdown.push((
                    format!("filename_overlap:{matched}/{}", log_tokens.len()),
                    MATCH_WEIGHT_FILENAME * fraction,
                ));
            }
        }

        let score: f64 = breakdown.iter().map(|(_, points)| points).sum();
        if score > 0.0 {
            candidates.push(MatchCandidate {
                confidence: (score / MATCH_MAX_SCORE).min(1.0),
                edge_count: edges.len(),
                node,
                score,
                breakdown,
            });
        }
    }

    if candidates.is_empty() {
        return Ok(MatchOutcome::NoConfidentMatch);
    }

    // Rank: score desc, then structural connectedness, then key for determinism
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.edge_count.cmp(&a.edge_count))
            .then(a.node.key.cmp(&b.node.key))
    });
    candidates.truncate(DEBUG_CANDIDATES);

    Ok(MatchOutcome::Match { candidates })
}

fn match_forced(store: &Store, forced: &str) -> StoreResult<MatchOutcome> {
    let forced = forced.to_ascii_lowercase();

    if let Some(node) = store.node_by_key(NodeType::Job, &forced)? {
        let edge_count = store.edge_count_from(node.id)?;
        return Ok(MatchOutcome::Match {
            candidates: vec![MatchCandidate {
                node,
                score: MATCH_MAX_SCORE,
                confidence: 1.0,
                breakdown: vec![("forced:exact".to_string(), MATCH_MAX_SCORE)],
                edge_count,
            }],
        });
    }

    let mut prefixed = store.nodes_by_key_prefix(NodeType::Job, &forced)?;
    if !prefixed.is_empty() {
        let node = prefixed.remove(0);
        let edge_count = store.edge_count_from(node.id)?;
        return Ok(MatchOutcome::Match {
            candidates: vec![MatchCandidate {
                node,
                score: MATCH_MAX_SCORE * 0.9,
                confidence: 0.9,
                breakdown: vec![("forced:prefix".to_string(), MATCH_MAX_SCORE * 0.9)],
                edge_count,
            }],
        });
    }

    Ok(MatchOutcome::NoConfidentMatch)
}

/// Render debug output for the candidate list
pub fn format_debug_candidates(candidates: &[MatchCandidate]) -> String {
    let mut lines = vec![String::new(), "=== MATCHING DEBUG (top candidates) ===".to_string()];
    for (rank, candidate) in candidates.iter().enumerate() {
        lines.push(format!(
            "\n{}. {} (score: {:.2}, edges: {})",
            rank + 1,
            candidate.node.key,
            candidate.score,
            candidate.edge_count
        ));
        lines.push(format!("   Display: {}", candidate.node.display_name));
        for (strategy, points) in &candidate.breakdown {
            lines.push(format!("   +{points:.1} {strategy}"));
        }
    }
    lines.push(format!("\n{}", "=".repeat(40)));
    lines.join("\n")
}
