//! Graph builder: snapshot directory tree -> artifacts, parsed jobs, nodes, edges
//!
//! Two passes are mandatory because references are forward-declared: a job
//! may reference scripts, control files, or document definitions whose
//! defining files are scanned later, or never (those become stub nodes).
//! Pass 1 parses every structural artifact into a typed node plus its
//! declared references; pass 2 resolves each declaration against the node
//! index and emits the typed edges.
//!
//! Re-scans diff by content hash: unchanged artifacts are skipped entirely;
//! changed artifacts have their previously derived edges removed before
//! re-derivation. Running the build twice on unchanged input yields an
//! identical node/edge set.

use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{should_store_content, DEFAULT_SCAN_DIRS};
use crate::hashing::sha256_hex;
use crate::parse::{parse_job, JobDecl};
use crate::paths::map_unix_to_snapshot;
use crate::store::{ArtifactRecord, NodeType, RelKind, Store};

/// Scan options
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Also scan the logs/ directory (slow, off by default)
    pub include_logs: bool,
}

/// Scan outcome counters
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_stored: usize,
    pub unchanged: usize,
    pub jobs_parsed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub parse_errors: usize,
}

/// Per-file facts produced by the parallel read/hash/parse stage
struct FileFacts {
    rel_path: String,
    kind: &'static str,
    mtime: f64,
    size: i64,
    sha256: Option<String>,
    text: Option<String>,
    job: Option<(String, JobDecl)>,
    error: Option<String>,
}

/// Map a file extension to its artifact kind
fn artifact_kind(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("procs") => "job",
        Some("sh") | Some("pl") | Some("py") => "script",
        Some("control") => "control",
        Some("ins") => "insert",
        Some("dfa") => "docdef",
        _ => "other",
    }
}

fn read_file_facts(snapshot: &Path, rel_path: String) -> FileFacts {
    let abs = snapshot.join(&rel_path);
    let kind = artifact_kind(&abs);

    let metadata = match std::fs::metadata(&abs) {
        Ok(meta) => meta,
        Err(err) => {
            return FileFacts {
                rel_path,
                kind,
                mtime: 0.0,
                size: 0,
                sha256: None,
                text: None,
                job: None,
                error: Some(format!("stat failed: {err}")),
            }
        }
    };
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let size = metadata.len() as i64;

    let mut sha256 = None;
    let mut text = None;
    let mut job = None;
    let mut error = None;

    if should_store_content(&abs, metadata.len()) {
        match std::fs::read(&abs) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => {
                    sha256 = Some(sha256_hex(content.as_bytes()));
                    if kind == "job" {
                        let name = abs
                            .file_stem()
                            .map(|s| s.to_string_lossy().to_ascii_lowercase())
                            .unwrap_or_default();
                        job = Some((name, parse_job(&content)));
                    }
                    text = Some(content);
                }
                // Not UTF-8: store metadata only
                Err(_) => {}
            },
            Err(err) => error = Some(format!("read failed: {err}")),
        }
    }

    FileFacts {
        rel_path,
        kind,
        mtime,
        size,
        sha256,
        text,
        job,
        error,
    }
}

/// Scan a snapshot and (re)build its execution graph.
///
/// Reading, hashing, and parsing run in parallel; all store writes and both
/// graph passes are strictly sequential afterwards so reference resolution
/// never observes a partially-populated node index.
pub fn scan_snapshot(
    store: &Store,
    snapshot: &Path,
    options: &ScanOptions,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<ScanStats> {
    let mut stats = ScanStats::default();

    // Collect candidate files in sorted order for determinism
    let mut scan_dirs: Vec<&str> = DEFAULT_SCAN_DIRS.to_vec();
    if options.include_logs {
        scan_dirs.push("logs");
    }

    let mut rel_paths: Vec<String> = Vec::new();
    for subdir in &scan_dirs {
        let dir = snapshot.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(snapshot) {
                rel_paths.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    rel_paths.sort();
    stats.files_scanned = rel_paths.len();

    // Parallel read + hash + parse (no shared mutable state)
    let facts: Vec<FileFacts> = rel_paths
        .into_par_iter()
        .map(|rel| read_file_facts(snapshot, rel))
        .collect();

    // Sequential artifact upserts with content-hash diffing
    let total = facts.len();
    let mut changed_jobs: Vec<(String, JobDecl, String)> = Vec::new();

    for (idx, fact) in facts.iter().enumerate() {
        if let Some(cb) = progress {
            cb(idx + 1, total);
        }

        if let Some(err) = &fact.error {
            log::warn!("skipping {}: {}", fact.rel_path, err);
            stats.parse_errors += 1;
            continue;
        }

        if fact.sha256.is_some() {
            let stored = store.artifact_sha(&fact.rel_path)?;
            if stored == fact.sha256 {
                stats.unchanged += 1;
                continue;
            }
            // Changed content: previously derived edges are stale
            if stored.is_some() {
                store.remove_edges_from_artifact(&fact.rel_path)?;
            }
        }

        store.upsert_artifact(&ArtifactRecord {
            kind: fact.kind,
            path: &fact.rel_path,
            original_path: None,
            sha256: fact.sha256.as_deref(),
            mtime: fact.mtime,
            size: fact.size,
            text_content: fact.text.as_deref(),
        })?;
        if fact.text.is_some() {
            stats.files_stored += 1;
        }

        if let Some((name, decl)) = &fact.job {
            if name.is_empty() {
                log::warn!("skipping job artifact without a stem: {}", fact.rel_path);
                stats.parse_errors += 1;
                continue;
            }
            store.upsert_job(
                name,
                &fact.rel_path,
                &decl.to_json(),
                fact.sha256.as_deref(),
            )?;
            stats.jobs_parsed += 1;
            changed_jobs.push((name.clone(), decl.clone(), fact.rel_path.clone()));
        }
    }

    let nodes_before = store.all_nodes()?.len();
    let edges_before = store.all_edges()?.len();

    // Pass 1: declare every job node before any reference is resolved
    for (name, decl, rel_path) in &changed_jobs {
        let display = format!("{} - {}", decl.cid.to_ascii_uppercase(), decl.app_type);
        store.upsert_node(NodeType::Job, name, &display, Some(rel_path), None, 1.0)?;
    }

    // Pass 2: resolve declared references, creating stubs where needed
    for (name, decl, rel_path) in &changed_jobs {
        resolve_job_references(store, snapshot, name, decl, rel_path)?;
    }

    stats.nodes_created = store.all_nodes()?.len().saturating_sub(nodes_before);
    stats.edges_created = store.all_edges()?.len().saturating_sub(edges_before);

    Ok(stats)
}

fn evidence(file: &str, line_no: Option<usize>, line_text: &str) -> String {
    serde_json::json!({
        "file": file,
        "line_no": line_no,
        "line_text": line_text,
    })
    .to_string()
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Resolve one job's declared references into typed edges (pass 2)
fn resolve_job_references(
    store: &Store,
    snapshot: &Path,
    name: &str,
    decl: &JobDecl,
    rel_path: &str,
) -> Result<()> {
    let job_node = match store.node_by_key(NodeType::Job, name)? {
        Some(node) => node,
        // Pass 1 creates every declaring job; a miss here is a logic error,
        // but a partial graph beats an aborted scan.
        None => {
            log::warn!("job node missing for {name}, skipping references");
            return Ok(());
        }
    };

    // Primary shell script: RUNS
    if let Some(script) = &decl.shell_script {
        let (canonical, confidence) = map_unix_to_snapshot(script, snapshot);
        let key = basename(script);
        let dst = store.upsert_node(
            NodeType::Script,
            &key,
            &key,
            canonical.as_deref(),
            Some(script),
            confidence.max(0.5),
        )?;
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::Runs,
            1.0,
            Some(&evidence(
                rel_path,
                decl.shell_script_line,
                &format!("__Shell Script: {script}"),
            )),
            Some(rel_path),
        )?;
    }

    // Auxiliary scripts: CALLS
    for script in decl.auxiliary_scripts() {
        let (canonical, confidence) = map_unix_to_snapshot(script, snapshot);
        let key = basename(script);
        let dst = store.upsert_node(
            NodeType::Script,
            &key,
            &key,
            canonical.as_deref(),
            Some(script),
            confidence.max(0.5),
        )?;
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::Calls,
            0.7,
            Some(&evidence(rel_path, None, &format!("Referenced: {script}"))),
            Some(rel_path),
        )?;
    }

    // Control / insert resources: READS
    for resource in decl.read_resources() {
        let (canonical, confidence) = map_unix_to_snapshot(resource, snapshot);
        let key = basename(resource);
        let dst = store.upsert_node(
            NodeType::Control,
            &key,
            &key,
            canonical.as_deref(),
            Some(resource),
            confidence.max(0.5),
        )?;
        let edge_confidence = if Some(resource) == decl.file_setup.as_deref() {
            1.0
        } else {
            0.8
        };
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::Reads,
            edge_confidence,
            Some(&evidence(rel_path, decl.file_setup_line, &format!("Reads: {resource}"))),
            Some(rel_path),
        )?;
    }

    // Cross-references to other jobs: REFERS_TO (stub if never scanned)
    for reference in &decl.cross_refs {
        let ref_name = file_stem(reference).to_ascii_lowercase();
        if ref_name == name {
            continue;
        }
        let dst = store.upsert_node(
            NodeType::Job,
            &ref_name,
            &ref_name,
            None,
            Some(reference),
            0.8,
        )?;
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::RefersTo,
            0.9,
            Some(&evidence(rel_path, None, &format!("refer to {reference}"))),
            Some(rel_path),
        )?;
    }

    // Document definitions: tokens embedded in the declaration...
    for token in &decl.docdef_tokens {
        let canonical = store
            .artifacts_by_kind_path_like("docdef", token)?
            .into_iter()
            .next()
            .map(|a| a.path);
        let confidence = if canonical.is_some() { 1.0 } else { 0.6 };
        let dst = store.upsert_node(
            NodeType::Docdef,
            token,
            token,
            canonical.as_deref(),
            None,
            confidence,
        )?;
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::RefersTo,
            0.6,
            Some(&evidence(rel_path, None, &format!("DOCDEF token {token}"))),
            Some(rel_path),
        )?;
    }

    // ...and .dfa files referenced by path
    for dfa_path in decl.docdef_paths() {
        let token = file_stem(dfa_path).to_ascii_uppercase();
        if decl.docdef_tokens.contains(&token) {
            continue;
        }
        let (canonical, confidence) = map_unix_to_snapshot(dfa_path, snapshot);
        let dst = store.upsert_node(
            NodeType::Docdef,
            &token,
            &token,
            canonical.as_deref(),
            Some(dfa_path),
            confidence.max(0.5),
        )?;
        store.upsert_edge(
            job_node.id,
            dst,
            RelKind::RefersTo,
            0.7,
            Some(&evidence(rel_path, None, &format!("Referenced: {dfa_path}"))),
            Some(rel_path),
        )?;
    }

    Ok(())
}
