//! Execution-graph construction and log-to-node matching

pub mod build;
pub mod matching;

pub use build::{scan_snapshot, ScanOptions, ScanStats};
pub use matching::{match_log, MatchCandidate, MatchOutcome};
