//! Configuration constants for Strata
//!
//! Snapshot layout conventions, storage limits, and the scoring/similarity
//! constants shared by the analysis components.

use std::path::{Path, PathBuf};

/// Directory holding derived state, relative to the snapshot root
pub const DB_DIR: &str = ".strata";

/// Database file name inside [`DB_DIR`]
pub const DB_NAME: &str = "strata.db";

/// Subdirectories scanned by default (logs are opt-in, they are large)
pub const DEFAULT_SCAN_DIRS: &[&str] = &["procs", "master", "control", "insert", "docdef"];

/// Maximum file size for storing text content in the database (1 MiB)
pub const MAX_TEXT_SIZE: u64 = 1024 * 1024;

/// Extensions treated as text (content stored and indexed for search)
pub const TEXT_EXTENSIONS: &[&str] = &[
    "procs", "sh", "pl", "py", "control", "ins", "txt", "md", "cfg", "conf", "ini", "sql", "dfa",
];

/// Extensions stored as metadata only (never read as text)
pub const METADATA_ONLY_EXTENSIONS: &[&str] = &["afp", "pdf", "zip", "pgp", "log"];

/// Matching engine weights (see `graph::matching`)
pub const MATCH_WEIGHT_PREFIX: f64 = 50.0;
pub const MATCH_WEIGHT_SCRIPT: f64 = 30.0;
pub const MATCH_WEIGHT_DOCDEF: f64 = 20.0;
pub const MATCH_WEIGHT_FILENAME: f64 = 10.0;

/// Confidence normalization base: the sum of all matching weights.
/// A full prefix+script+docdef match (100 points) normalizes to ~0.91.
pub const MATCH_MAX_SCORE: f64 =
    MATCH_WEIGHT_PREFIX + MATCH_WEIGHT_SCRIPT + MATCH_WEIGHT_DOCDEF + MATCH_WEIGHT_FILENAME;

/// Minimum Jaccard similarity for a case card to be considered related
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Maximum similar cases returned per analysis
pub const SIMILAR_CASES_LIMIT: usize = 5;

/// Maximum hypotheses returned per analysis
pub const MAX_HYPOTHESES: usize = 3;

/// Maximum lines in a rendered context pack
pub const MAX_CONTEXT_PACK_LINES: usize = 200;

/// Maximum evidence snippet length (chars)
pub const MAX_EVIDENCE_SNIPPET: usize = 120;

/// Get the database path for a snapshot
pub fn db_path(snapshot: &Path) -> PathBuf {
    snapshot.join(DB_DIR).join(DB_NAME)
}

/// Check whether a file's extension marks it as text-bearing
pub fn is_text_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            if METADATA_ONLY_EXTENSIONS.contains(&ext.as_str()) {
                return false;
            }
            TEXT_EXTENSIONS.contains(&ext.as_str())
        }
        // No extension: probe as text, the reader validates UTF-8
        None => true,
    }
}

/// Check whether a file's content should be stored (text kind + size cap)
pub fn should_store_content(path: &Path, size: u64) -> bool {
    size <= MAX_TEXT_SIZE && is_text_extension(path)
}
