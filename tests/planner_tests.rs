//! Tests for the bundle planner
//!
//! Covers intent parsing against a scanned fixture, candidate scoring,
//! job-family control selection, and the letter-number filter.

use std::fs;

use strata::analysis::generate_plan;
use strata::graph::{scan_snapshot, ScanOptions};
use strata::Store;
use tempfile::TempDir;

const LETTER_JOB: &str = "\
Firm: West Community CU
CID : wccu
Application Type: Business Rate Change Notice

__Processing Shell Script: /home/master/wccudl1_process.sh
__File Setup Before Processing: /home/insert/wccudl1.ins

Letter formats WCCUDL014 and WCCUDL015 are produced from this job.
";

const STATEMENT_JOB: &str = "\
Firm: West Community CU
CID : wccu
Application Type: Monthly Statements

__Processing Shell Script: /home/master/wccuds1_process.sh
";

fn fixture() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    for dir in ["procs", "master", "insert", "control", "docdef"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("procs/wccudl1.procs"), LETTER_JOB).unwrap();
    fs::write(root.join("procs/wccuds1.procs"), STATEMENT_JOB).unwrap();
    fs::write(root.join("master/wccudl1_process.sh"), "#!/bin/sh\n").unwrap();
    fs::write(root.join("master/wccuds1_process.sh"), "#!/bin/sh\n").unwrap();
    fs::write(root.join("insert/wccudl1.ins"), "input=/d/wccu/in.csv\n").unwrap();
    fs::write(
        root.join("control/wccudl.control"),
        "format_dfa=\"WCCUDL014\"\nind_pdf_format_dfa=\"WCCUDL015\"\n",
    )
    .unwrap();
    fs::write(root.join("docdef/wccudl014.dfa"), "letter 14 layout\n").unwrap();
    fs::write(root.join("docdef/wccudl015.dfa"), "letter 15 layout\n").unwrap();

    let store = Store::open_snapshot(root).unwrap();
    scan_snapshot(&store, root, &ScanOptions::default(), None).unwrap();
    (tmp, store)
}

#[test]
fn test_letter_filter_keeps_only_requested_letter() {
    let (_tmp, store) = fixture();

    let plan = generate_plan(
        &store,
        None,
        None,
        Some("WCCU Letter 14 - Business Rate Change Notice"),
        5,
    )
    .unwrap();

    let winner = &plan.candidates[0];
    assert_eq!(winner.key, "wccudl1");

    let docdefs: Vec<&str> = winner
        .files
        .iter()
        .filter(|f| f.kind == "docdef")
        .map(|f| f.path.as_str())
        .collect();
    assert!(docdefs.contains(&"docdef/wccudl014.dfa"), "files: {docdefs:?}");
    assert!(
        !docdefs.contains(&"docdef/wccudl015.dfa"),
        "the sibling letter must be filtered out: {docdefs:?}"
    );
}

#[test]
fn test_exact_key_match_dominates() {
    let (_tmp, store) = fixture();

    let plan = generate_plan(&store, Some("wccu"), Some("dl1"), None, 5).unwrap();
    assert!(!plan.tied);

    let winner = &plan.candidates[0];
    assert_eq!(winner.key, "wccudl1");
    assert!(winner
        .breakdown
        .iter()
        .any(|(rule, points)| rule == "exact_key_match" && *points == 50.0));

    // Sibling jobs for the same customer id rank below
    assert!(plan.candidates.iter().any(|c| c.key == "wccuds1"));
    assert!(winner.score > plan.candidates[1].score);
}

#[test]
fn test_controls_attach_by_job_family_not_bare_cid() {
    let (_tmp, store) = fixture();

    let plan = generate_plan(&store, Some("wccu"), None, None, 5).unwrap();

    let letters = plan
        .candidates
        .iter()
        .find(|c| c.key == "wccudl1")
        .expect("letter job found");
    assert!(
        letters.files.iter().any(|f| f.kind == "control" && f.path == "control/wccudl.control"),
        "family wccudl matches the control"
    );

    let statements = plan
        .candidates
        .iter()
        .find(|c| c.key == "wccuds1")
        .expect("statement job found");
    assert!(
        !statements.files.iter().any(|f| f.kind == "control"),
        "family wccuds must not pick up the wccudl control despite the shared cid"
    );
}

#[test]
fn test_bundle_contains_scripts_and_inserts_from_edges() {
    let (_tmp, store) = fixture();

    let plan = generate_plan(&store, Some("wccu"), Some("dl1"), None, 5).unwrap();
    let winner = &plan.candidates[0];

    assert!(winner.files.iter().any(|f| f.kind == "job" && f.path == "procs/wccudl1.procs"));
    assert!(winner
        .files
        .iter()
        .any(|f| f.kind == "script" && f.path == "master/wccudl1_process.sh"));
    assert!(winner
        .files
        .iter()
        .any(|f| f.kind == "insert" && f.path == "insert/wccudl1.ins"));
}

#[test]
fn test_title_phrase_scores_30() {
    let (_tmp, store) = fixture();

    let plan = generate_plan(
        &store,
        None,
        None,
        Some("WCCU Letter 14 - Business Rate Change Notice"),
        5,
    )
    .unwrap();

    let winner = &plan.candidates[0];
    assert!(winner
        .breakdown
        .iter()
        .any(|(rule, points)| rule == "title_phrase_match" && *points == 30.0));
}

#[test]
fn test_keyword_fallback_without_cid() {
    let (_tmp, store) = fixture();

    // No 4-uppercase-letter token in the title: keyword search drives it
    let plan = generate_plan(&store, None, None, Some("business rate change"), 5).unwrap();
    assert!(plan.candidates.iter().any(|c| c.key == "wccudl1"));
}

#[test]
fn test_no_candidates_is_empty_not_error() {
    let (_tmp, store) = fixture();
    let plan = generate_plan(&store, Some("zzzz"), None, None, 5).unwrap();
    assert!(plan.candidates.is_empty());
}
