//! Strata: deterministic failure analysis for legacy batch-processing snapshots
//!
//! Strata indexes an unindexed snapshot of a legacy batch environment (job
//! definitions, scripts, control files, document definitions) into a typed
//! execution graph, then turns a failing log into a ranked, evidence-backed
//! explanation: most likely failing node, decoded message codes, external
//! signals, hypotheses, and similar past cases.
//!
//! # Determinism
//!
//! Everything is deterministic by construction: files are indexed in sorted
//! order, re-scans diff by content hash, scoring is a pure function of the
//! parsed log and the graph snapshot, and every ranking tie has an explicit
//! break. Running the same command twice on unchanged input produces
//! identical output.
//!
//! # Derived state
//!
//! Snapshot files are never mutated. All derived state lives in one SQLite
//! database under `<snapshot>/.strata/`.

pub mod analysis;
pub mod config;
pub mod graph;
pub mod hashing;
pub mod output;
pub mod parse;
pub mod paths;
pub mod rules;
pub mod store;
pub mod version;

pub use analysis::{
    find_similar_cases, generate_plan, jaccard, rank_hypotheses, run_explain, ExplainOptions,
    ExplainReport, Hypothesis, HypothesisTier, Plan, SimilarCase,
};
pub use graph::{match_log, scan_snapshot, MatchCandidate, MatchOutcome, ScanOptions, ScanStats};
pub use output::{generate_execution_id, output_json, JsonResponse, OutputFormat};
pub use parse::{analyze_log, parse_job, JobDecl, LogAnalysis, Severity};
pub use rules::{ExternalSignal, RuleSet, SignalRule};
pub use store::{
    ArtifactRecord, CaseCardRecord, IncidentRecord, MessageCode, NodeRow, NodeType, RelKind,
    Store, StoreError,
};
