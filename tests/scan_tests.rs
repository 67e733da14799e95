//! Tests for snapshot scanning and graph construction
//!
//! Covers the two-pass build, stub creation, content-hash idempotence, and
//! re-derivation of edges when an artifact changes.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use strata::graph::{scan_snapshot, ScanOptions};
use strata::store::NodeType;
use strata::Store;
use tempfile::TempDir;

const JOB_TEXT: &str = "\
Firm: BK Financial
CID : bkfn
Application Type: Statements

__Processing Shell Script: /home/master/bkfnds1_process.sh
__Log File: /d/bkfn/bkfnds1/bkfnds1.log
__File Setup Before Processing: /home/insert/bkfnds1.ins

Uses DOCDEF BKFNDS11 for the statement body.
For the archive flow refer to /home/procs/bkfnar1.procs
";

fn build_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    for dir in ["procs", "master", "insert", "docdef", "control"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("procs/bkfnds1.procs"), JOB_TEXT).unwrap();
    fs::write(root.join("master/bkfnds1_process.sh"), "#!/bin/sh\necho run\n").unwrap();
    fs::write(root.join("insert/bkfnds1.ins"), "input=/d/bkfn/in.csv\n").unwrap();
    fs::write(root.join("docdef/bkfnds11.dfa"), "layout for BKFNDS11\n").unwrap();
    tmp
}

fn scan(store: &Store, root: &Path) -> strata::ScanStats {
    scan_snapshot(store, root, &ScanOptions::default(), None).unwrap()
}

#[test]
fn test_scan_builds_expected_graph() {
    let tmp = build_fixture();
    let store = Store::open_snapshot(tmp.path()).unwrap();

    let stats = scan(&store, tmp.path());
    assert_eq!(stats.files_scanned, 4);
    assert_eq!(stats.jobs_parsed, 1);

    // Defined job node
    let job = store.node_by_key(NodeType::Job, "bkfnds1").unwrap().unwrap();
    assert_eq!(job.display_name, "BKFN - Statements");
    assert_eq!(job.canonical_path.as_deref(), Some("procs/bkfnds1.procs"));

    // Referenced-but-never-scanned job becomes a stub
    let stub = store.node_by_key(NodeType::Job, "bkfnar1").unwrap().unwrap();
    assert!(stub.canonical_path.is_none());
    assert!(stub.confidence < 1.0);

    // Script resolved through the path mapping
    let script = store
        .node_by_key(NodeType::Script, "bkfnds1_process.sh")
        .unwrap()
        .unwrap();
    assert_eq!(
        script.canonical_path.as_deref(),
        Some("master/bkfnds1_process.sh")
    );

    // Edge set: RUNS script, READS insert, REFERS_TO stub job + docdef
    let edges = store.all_edges().unwrap();
    let rels: Vec<(String, String)> = edges
        .iter()
        .map(|e| (e.rel_type.clone(), e.dst_key.clone()))
        .collect();
    assert!(rels.contains(&("RUNS".to_string(), "bkfnds1_process.sh".to_string())));
    assert!(rels.contains(&("READS".to_string(), "bkfnds1.ins".to_string())));
    assert!(rels.contains(&("REFERS_TO".to_string(), "bkfnar1".to_string())));
    assert!(rels.contains(&("REFERS_TO".to_string(), "BKFNDS11".to_string())));

    // Docdef token resolved to its scanned artifact
    let docdef = store.node_by_key(NodeType::Docdef, "BKFNDS11").unwrap().unwrap();
    assert_eq!(docdef.canonical_path.as_deref(), Some("docdef/bkfnds11.dfa"));
}

#[test]
fn test_rescan_unchanged_is_idempotent() {
    let tmp = build_fixture();
    let store = Store::open_snapshot(tmp.path()).unwrap();

    scan(&store, tmp.path());
    let nodes_first = store.all_nodes().unwrap();
    let edges_first = store.all_edges().unwrap();

    let stats = scan(&store, tmp.path());
    assert_eq!(stats.unchanged, 4, "every artifact must be skipped");
    assert_eq!(stats.nodes_created, 0);
    assert_eq!(stats.edges_created, 0);

    let nodes_second = store.all_nodes().unwrap();
    let edges_second = store.all_edges().unwrap();
    assert_eq!(nodes_first.len(), nodes_second.len());
    assert_eq!(edges_first, edges_second);
    for (a, b) in nodes_first.iter().zip(nodes_second.iter()) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.node_type, b.node_type);
        assert_eq!(a.canonical_path, b.canonical_path);
    }
}

#[test]
fn test_changed_artifact_rederives_edges() {
    let tmp = build_fixture();
    let store = Store::open_snapshot(tmp.path()).unwrap();
    scan(&store, tmp.path());

    // Point the job at a different script
    fs::write(tmp.path().join("master/bkfnds1_v2.sh"), "#!/bin/sh\n").unwrap();
    let updated = JOB_TEXT.replace("bkfnds1_process.sh", "bkfnds1_v2.sh");
    fs::write(tmp.path().join("procs/bkfnds1.procs"), updated).unwrap();

    let stats = scan(&store, tmp.path());
    assert_eq!(stats.jobs_parsed, 1, "only the changed job re-parses");

    let edges = store.all_edges().unwrap();
    let runs: Vec<&str> = edges
        .iter()
        .filter(|e| e.rel_type == "RUNS")
        .map(|e| e.dst_key.as_str())
        .collect();
    assert_eq!(runs, vec!["bkfnds1_v2.sh"], "stale RUNS edge must be gone");
}

#[test]
fn test_unreadable_artifact_does_not_abort_scan() {
    let tmp = build_fixture();
    // A job artifact that is not valid UTF-8: stored metadata-only, skipped
    // as a parse source, and the scan continues
    fs::write(tmp.path().join("procs/broken.procs"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

    let store = Store::open_snapshot(tmp.path()).unwrap();
    let stats = scan(&store, tmp.path());

    assert_eq!(stats.files_scanned, 5);
    assert_eq!(stats.jobs_parsed, 1, "the broken file never parses as a job");
    assert!(store.node_by_key(NodeType::Job, "bkfnds1").unwrap().is_some());
    assert!(store.node_by_key(NodeType::Job, "broken").unwrap().is_none());
}

#[test]
fn test_stub_upgraded_when_defining_file_appears() {
    let tmp = build_fixture();
    let store = Store::open_snapshot(tmp.path()).unwrap();
    scan(&store, tmp.path());

    let stub = store.node_by_key(NodeType::Job, "bkfnar1").unwrap().unwrap();
    assert!(stub.canonical_path.is_none());

    // The archive job's definition shows up in a later snapshot state
    fs::write(
        tmp.path().join("procs/bkfnar1.procs"),
        "Firm: BK Financial\nCID : bkfn\nApplication Type: Archive\n",
    )
    .unwrap();
    scan(&store, tmp.path());

    let upgraded = store.node_by_key(NodeType::Job, "bkfnar1").unwrap().unwrap();
    assert_eq!(upgraded.id, stub.id, "the stub upgrades in place");
    assert_eq!(
        upgraded.canonical_path.as_deref(),
        Some("procs/bkfnar1.procs")
    );
}

#[test]
fn test_search_finds_scanned_content() {
    let tmp = build_fixture();
    let store = Store::open_snapshot(tmp.path()).unwrap();
    scan(&store, tmp.path());

    let (hits, _method) = store.full_text_search("bkfnds1", 10, false).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().any(|h| h.path == "procs/bkfnds1.procs"));
}
