//! Tests for the log-to-node matching engine
//!
//! Covers the documented scoring weights, confidence normalization, the
//! explicit no-match outcome, monotonicity, and deterministic tie-breaks.

use std::fs;
use std::path::Path;

use strata::graph::{match_log, scan_snapshot, MatchOutcome, ScanOptions};
use strata::parse::analyze_log;
use strata::store::{NodeType, RelKind};
use strata::Store;
use tempfile::TempDir;

const JOB_TEXT: &str = "\
Firm: BK Financial
CID : bkfn
Application Type: Statements

__Processing Shell Script: /home/master/bkfnds1_process.sh
__File Setup Before Processing: /home/insert/bkfnds1.ins

Uses DOCDEF BKFNDS11 for the statement body.
";

fn build_fixture() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    for dir in ["procs", "master", "insert", "docdef"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("procs/bkfnds1.procs"), JOB_TEXT).unwrap();
    fs::write(root.join("master/bkfnds1_process.sh"), "#!/bin/sh\n").unwrap();
    fs::write(root.join("insert/bkfnds1.ins"), "input=/d/in.csv\n").unwrap();
    fs::write(root.join("docdef/bkfnds11.dfa"), "layout\n").unwrap();

    let store = Store::open_snapshot(root).unwrap();
    scan_snapshot(&store, root, &ScanOptions::default(), None).unwrap();
    (tmp, store)
}

#[test]
fn test_full_signal_log_scores_100_with_91_percent_confidence() {
    let (_tmp, store) = build_fixture();

    let log_text = "\
$PREFIX=bkfnds1 starting
running /home/master/bkfnds1_process.sh
DOCDEF 'BKFNDS11' selected for statement
";
    let analysis = analyze_log(log_text, "/tmp/failure.log");
    let outcome = match_log(&store, &analysis, Path::new("/tmp/failure.log"), None).unwrap();

    let top = outcome.top().expect("a confident match");
    assert_eq!(top.node.key, "bkfnds1");
    assert_eq!(top.score, 100.0, "prefix(50) + script(30) + docdef(20)");
    assert!(
        (top.confidence - 0.909).abs() < 0.01,
        "confidence normalizes against 110, got {}",
        top.confidence
    );
}

#[test]
fn test_no_signal_log_yields_explicit_no_match() {
    let (_tmp, store) = build_fixture();

    let analysis = analyze_log("nothing recognizable here\n", "/tmp/other.log");
    let outcome = match_log(&store, &analysis, Path::new("/tmp/other.log"), None).unwrap();

    assert!(
        matches!(outcome, MatchOutcome::NoConfidentMatch),
        "zero-score candidates must not produce an arbitrary top-1"
    );
}

#[test]
fn test_score_is_monotonic_in_signals() {
    let (_tmp, store) = build_fixture();
    let log_path = Path::new("/tmp/failure.log");

    let prefix_only = analyze_log("$PREFIX=bkfnds1\n", "/tmp/failure.log");
    let with_script = analyze_log(
        "$PREFIX=bkfnds1\nrunning /home/master/bkfnds1_process.sh\n",
        "/tmp/failure.log",
    );
    let with_docdef = analyze_log(
        "$PREFIX=bkfnds1\nrunning /home/master/bkfnds1_process.sh\nDOCDEF 'BKFNDS11'\n",
        "/tmp/failure.log",
    );

    let score = |analysis| {
        match_log(&store, analysis, log_path, None)
            .unwrap()
            .top()
            .map(|c| c.score)
            .unwrap_or(0.0)
    };

    let a = score(&prefix_only);
    let b = score(&with_script);
    let c = score(&with_docdef);
    assert!(a < b && b < c, "each added true signal must not decrease the score");
    assert_eq!(a, 50.0);
    assert_eq!(b, 80.0);
    assert_eq!(c, 100.0);
}

#[test]
fn test_filename_overlap_contributes_scaled_points() {
    let (_tmp, store) = build_fixture();

    // No tokens extracted from the body; only the log's own file name links
    // it to the job
    let analysis = analyze_log("nothing recognizable\n", "/d/logs/bkfnds1.log");
    let outcome = match_log(&store, &analysis, Path::new("/d/logs/bkfnds1.log"), None).unwrap();

    let top = outcome.top().expect("filename overlap alone should match");
    assert_eq!(top.node.key, "bkfnds1");
    assert!(top.score > 0.0 && top.score <= 10.0);
}

#[test]
fn test_ties_break_by_edge_count_then_key() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open_snapshot(tmp.path()).unwrap();

    // Two jobs, both reachable to the same docdef; zeta has more edges
    let zeta = store
        .upsert_node(NodeType::Job, "zetajob", "zeta", None, None, 1.0)
        .unwrap();
    let alpha = store
        .upsert_node(NodeType::Job, "alphajob", "alpha", None, None, 1.0)
        .unwrap();
    let docdef = store
        .upsert_node(NodeType::Docdef, "ACBKDS11", "ACBKDS11", None, None, 1.0)
        .unwrap();
    let extra = store
        .upsert_node(NodeType::Script, "extra.sh", "extra.sh", None, None, 1.0)
        .unwrap();

    store
        .upsert_edge(zeta, docdef, RelKind::RefersTo, 1.0, None, None)
        .unwrap();
    store
        .upsert_edge(alpha, docdef, RelKind::RefersTo, 1.0, None, None)
        .unwrap();

    let analysis = analyze_log("docdef=ACBKDS11\n", "/tmp/x.log");

    // Same score, same edge count: lexical order wins
    let outcome = match_log(&store, &analysis, Path::new("/tmp/x.log"), None).unwrap();
    assert_eq!(outcome.top().unwrap().node.key, "alphajob");

    // Give zeta an extra edge: structural connectedness now wins
    store
        .upsert_edge(zeta, extra, RelKind::Runs, 1.0, None, None)
        .unwrap();
    let outcome = match_log(&store, &analysis, Path::new("/tmp/x.log"), None).unwrap();
    assert_eq!(outcome.top().unwrap().node.key, "zetajob");
}

#[test]
fn test_forced_job_bypasses_scoring() {
    let (_tmp, store) = build_fixture();
    let analysis = analyze_log("nothing recognizable\n", "/tmp/x.log");

    let outcome =
        match_log(&store, &analysis, Path::new("/tmp/x.log"), Some("bkfnds1")).unwrap();
    let top = outcome.top().unwrap();
    assert_eq!(top.node.key, "bkfnds1");
    assert_eq!(top.confidence, 1.0);

    // Key-prefix override resolves with reduced confidence
    let outcome = match_log(&store, &analysis, Path::new("/tmp/x.log"), Some("bkfn")).unwrap();
    assert_eq!(outcome.top().unwrap().confidence, 0.9);

    // Unknown override is an explicit miss
    let outcome = match_log(&store, &analysis, Path::new("/tmp/x.log"), Some("zzz")).unwrap();
    assert!(matches!(outcome, MatchOutcome::NoConfidentMatch));
}

#[test]
fn test_matching_is_deterministic() {
    let (_tmp, store) = build_fixture();
    let analysis = analyze_log(
        "$PREFIX=bkfnds1\nDOCDEF 'BKFNDS11'\n",
        "/tmp/failure.log",
    );

    let first = match_log(&store, &analysis, Path::new("/tmp/failure.log"), None).unwrap();
    let second = match_log(&store, &analysis, Path::new("/tmp/failure.log"), None).unwrap();
    let (a, b) = (first.top().unwrap(), second.top().unwrap());
    assert_eq!(a.node.key, b.node.key);
    assert_eq!(a.score, b.score);
    assert_eq!(a.breakdown, b.breakdown);
}
