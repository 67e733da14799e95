//! End-to-end smoke tests driving the strata binary
//!
//! Each test spawns the compiled binary against a temp snapshot, the way an
//! operator would use it.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn strata_bin() -> String {
    std::env::var("CARGO_BIN_EXE_strata").unwrap_or_else(|_| {
        let mut path = std::env::current_exe().unwrap();
        path.pop();
        path.pop();
        path.push("strata");
        path.to_str().unwrap().to_string()
    })
}

fn build_snapshot(root: &Path) {
    for dir in ["procs", "master", "insert", "docdef"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(
        root.join("procs/bkfnds1.procs"),
        "Firm: BK Financial\nCID : bkfn\nApplication Type: Statements\n\
         __Processing Shell Script: /home/master/bkfnds1_process.sh\n\
         __File Setup Before Processing: /home/insert/bkfnds1.ins\n\
         Uses DOCDEF BKFNDS11 for the statement body.\n",
    )
    .unwrap();
    fs::write(root.join("master/bkfnds1_process.sh"), "#!/bin/sh\n").unwrap();
    fs::write(root.join("insert/bkfnds1.ins"), "input=/d/in.csv\n").unwrap();
    fs::write(root.join("docdef/bkfnds11.dfa"), "layout\n").unwrap();
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(strata_bin())
        .args(args)
        .output()
        .expect("failed to run strata binary")
}

#[test]
fn test_scan_then_status() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();

    let output = run(&["scan", snap]);
    assert!(output.status.success(), "scan failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scan complete"));
    assert!(stdout.contains("Jobs parsed: 1"));

    let output = run(&["status", snap, "--output", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status emits valid JSON");
    assert_eq!(parsed["data"]["jobs"], 1);
    assert!(parsed["schema_version"].is_string());
}

#[test]
fn test_explain_prints_context_pack_and_records_incident() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let log = tmp.path().join("bkfnds1.log");
    fs::write(&log, "$PREFIX=bkfnds1 started\nPPDE1001F input not generated\n").unwrap();
    let log_arg = log.to_str().unwrap();

    let output = run(&["explain", snap, "--log", log_arg]);
    assert!(output.status.success(), "explain failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("STRATA CONTEXT PACK"));
    assert!(stdout.contains("Key: bkfnds1"));

    let output = run(&["incidents", snap]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bkfnds1.log"));
}

#[test]
fn test_missing_snapshot_is_fatal_with_nonzero_exit() {
    let output = run(&["scan", "/nonexistent/snapshot/path"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_missing_log_is_fatal() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let output = run(&["explain", snap, "--log", "/nonexistent.log"]);
    assert!(!output.status.success());
}

#[test]
fn test_import_codes_roundtrip() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let codes = tmp.path().join("codes.jsonl");
    fs::write(
        &codes,
        r#"{"code": "PPDE1001F", "title": "Input missing", "body": "The declared input file could not be opened."}
{"code": "PPCS8005I", "body": "Conversion finished."}
{"code": "NOSEVERITY", "body": "dropped"}
"#,
    )
    .unwrap();

    let output = run(&["import-codes", snap, "--file", codes.to_str().unwrap()]);
    assert!(output.status.success(), "import failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Codes stored/updated: 2"));

    // A decoded fatal code now shows its title in the context pack
    let log = tmp.path().join("bkfnds1.log");
    fs::write(&log, "PPDE1001F aborted run\n").unwrap();
    let output = run(&["explain", snap, "--log", log.to_str().unwrap(), "--no-persist"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Input missing"));
}

#[test]
fn test_import_cases_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let cases = tmp.path().join("cases.jsonl");
    fs::write(
        &cases,
        r#"{"title": "ORA timeout", "signals": ["ORA-12170"], "root_cause": "listener down", "fix_summary": "restart listener"}
"#,
    )
    .unwrap();

    let output = run(&["import-cases", snap, "--file", cases.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Inserted: 1"));

    let output = run(&["import-cases", snap, "--file", cases.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Inserted: 0"));
    assert!(stdout.contains("Unchanged (already imported): 1"));
}

#[test]
fn test_plan_json_has_fixed_keys() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let output = run(&["plan", snap, "--cid", "bkfn", "--job-id", "ds1", "--json", "--lang", "ru"]);
    assert!(output.status.success(), "plan failed: {:?}", output);
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("plan emits valid JSON");

    // JSON keys stay English regardless of --lang
    assert!(parsed.get("snapshot_root").is_some());
    assert!(parsed.get("intent").is_some());
    assert!(parsed.get("selected_bundle").is_some());
    assert!(parsed.get("other_candidates_summary").is_some());
    assert_eq!(parsed["selected_bundle"]["key"], "bkfnds1");
}

#[test]
fn test_search_finds_indexed_artifacts() {
    let tmp = TempDir::new().unwrap();
    build_snapshot(tmp.path());
    let snap = tmp.path().to_str().unwrap();
    assert!(run(&["scan", snap]).status.success());

    let output = run(&["search", snap, "bkfnds"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("procs/bkfnds1.procs"));
}
