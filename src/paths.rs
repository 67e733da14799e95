//! Path mapping between the legacy unix layout and the snapshot tree
//!
//! Job definitions and logs reference absolute paths from the production
//! machines (`/home/master/...`); the snapshot stores the same files under
//! relative directories (`master/...`). Mapping carries a confidence value
//! because snapshot trees are incomplete and occasionally re-cased.

use std::path::Path;

use walkdir::WalkDir;

use crate::config::DEFAULT_SCAN_DIRS;

/// Prefix rewrites from production paths to snapshot-relative directories.
/// `/home/util/` is folded into `master/` because utility scripts live there
/// in every snapshot observed so far.
const PATH_MAPPINGS: &[(&str, &str)] = &[
    ("/home/procs/", "procs/"),
    ("/home/master/", "master/"),
    ("/home/control/", "control/"),
    ("/home/insert/", "insert/"),
    ("/home/docdef/", "docdef/"),
    ("/home/util/", "master/"),
];

/// Normalize a path string to canonical form (forward slashes, trimmed)
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim().to_string()
}

/// Map a production unix path to a snapshot-relative path.
///
/// Returns `(relative_path, confidence)`:
/// - direct prefix mapping to an existing file: 1.0
/// - unique basename match inside a scan directory: 0.7
/// - ambiguous basename match (first in sorted order): 0.5
/// - no mapping: `(None, 0.0)`
pub fn map_unix_to_snapshot(unix_path: &str, snapshot: &Path) -> (Option<String>, f64) {
    let normalized = normalize_path(unix_path);

    for (prefix, replacement) in PATH_MAPPINGS {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            let relative = format!("{}{}", replacement, rest);
            if snapshot.join(&relative).is_file() {
                return (Some(relative), 1.0);
            }
        }
    }

    // Fall back to a basename search across the scanned directories
    let file_name = match Path::new(&normalized).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return (None, 0.0),
    };

    let mut matches: Vec<String> = Vec::new();
    for subdir in DEFAULT_SCAN_DIRS {
        let dir = snapshot.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name().to_string_lossy() == file_name {
                if let Ok(rel) = entry.path().strip_prefix(snapshot) {
                    matches.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
    }
    matches.sort();

    match matches.len() {
        0 => (None, 0.0),
        1 => (Some(matches.remove(0)), 0.7),
        _ => (Some(matches.remove(0)), 0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_direct_prefix_mapping() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("master")).unwrap();
        fs::write(tmp.path().join("master/run.sh"), "#!/bin/sh\n").unwrap();

        let (mapped, confidence) = map_unix_to_snapshot("/home/master/run.sh", tmp.path());
        assert_eq!(mapped.as_deref(), Some("master/run.sh"));
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_util_folds_into_master() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("master")).unwrap();
        fs::write(tmp.path().join("master/cleanup.pl"), "").unwrap();

        let (mapped, confidence) = map_unix_to_snapshot("/home/util/cleanup.pl", tmp.path());
        assert_eq!(mapped.as_deref(), Some("master/cleanup.pl"));
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_basename_fallback_unique() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("insert")).unwrap();
        fs::write(tmp.path().join("insert/bkfnds1.ins"), "").unwrap();

        let (mapped, confidence) = map_unix_to_snapshot("/d/staging/bkfnds1.ins", tmp.path());
        assert_eq!(mapped.as_deref(), Some("insert/bkfnds1.ins"));
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn test_unmapped_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (mapped, confidence) = map_unix_to_snapshot("/home/master/absent.sh", tmp.path());
        assert_eq!(mapped, None);
        assert_eq!(confidence, 0.0);
    }
}
