//! Tests for incident persistence through the explain flow

use std::fs;

use strata::analysis::{run_explain, ExplainOptions};
use strata::graph::{scan_snapshot, ScanOptions};
use strata::Store;
use tempfile::TempDir;

fn fixture() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("procs")).unwrap();
    fs::create_dir_all(root.join("master")).unwrap();
    fs::write(
        root.join("procs/bkfnds1.procs"),
        "Firm: BK\nCID : bkfn\nApplication Type: Statements\n\
         __Processing Shell Script: /home/master/bkfnds1_process.sh\n",
    )
    .unwrap();
    fs::write(root.join("master/bkfnds1_process.sh"), "#!/bin/sh\n").unwrap();

    let store = Store::open_snapshot(root).unwrap();
    scan_snapshot(&store, root, &ScanOptions::default(), None).unwrap();
    (tmp, store)
}

fn persist_options() -> ExplainOptions {
    ExplainOptions {
        persist: true,
        ..ExplainOptions::default()
    }
}

#[test]
fn test_explain_twice_yields_one_incident_with_second_values() {
    let (tmp, store) = fixture();
    let log = tmp.path().join("bkfnds1.log");

    fs::write(&log, "$PREFIX=bkfnds1 started\n").unwrap();
    run_explain(&store, tmp.path(), &log, &persist_options()).unwrap();

    let key = log.display().to_string();
    let first = store
        .incident_by_log_path(&key)
        .unwrap()
        .expect("incident row written");
    assert!(first.updated_at.is_none());

    // Second run on the same path: a richer log this time
    fs::write(
        &log,
        "$PREFIX=bkfnds1 started\nrunning /home/master/bkfnds1_process.sh\n",
    )
    .unwrap();
    run_explain(&store, tmp.path(), &log, &persist_options()).unwrap();

    assert_eq!(store.count_incidents().unwrap(), 1, "re-analysis replaces, never appends");
    let second = store
        .incident_by_log_path(&first.log_path)
        .unwrap()
        .expect("incident row still present");
    assert_eq!(second.id, first.id);
    assert!(second.updated_at.is_some());
    assert!(
        second.confidence.unwrap() > first.confidence.unwrap(),
        "the second run's values win"
    );
}

#[test]
fn test_no_persist_leaves_store_untouched() {
    let (tmp, store) = fixture();
    let log = tmp.path().join("bkfnds1.log");
    fs::write(&log, "$PREFIX=bkfnds1 started\n").unwrap();

    run_explain(
        &store,
        tmp.path(),
        &log,
        &ExplainOptions {
            persist: false,
            ..ExplainOptions::default()
        },
    )
    .unwrap();

    assert_eq!(store.count_incidents().unwrap(), 0);
}

#[test]
fn test_no_match_incident_records_null_node() {
    let (tmp, store) = fixture();
    let log = tmp.path().join("mystery.log");
    fs::write(&log, "nothing recognizable here\n").unwrap();

    run_explain(&store, tmp.path(), &log, &persist_options()).unwrap();

    let incidents = store.list_incidents(10).unwrap();
    assert_eq!(incidents.len(), 1);
    assert!(incidents[0].top_node_key.is_none());
    assert!(incidents[0].confidence.is_none());
}

#[test]
fn test_incidents_listing_most_recent_first() {
    let (tmp, store) = fixture();

    for name in ["a.log", "b.log"] {
        let log = tmp.path().join(name);
        fs::write(&log, "$PREFIX=bkfnds1\n").unwrap();
        run_explain(&store, tmp.path(), &log, &persist_options()).unwrap();
    }

    let incidents = store.list_incidents(10).unwrap();
    assert_eq!(incidents.len(), 2);
    assert!(incidents[0].log_path.ends_with("b.log"));
}
