//! Full-text search over indexed artifacts
//!
//! Smart expansion, mirroring how operators actually search: a bare
//! identifier fragment should hit file paths first, then exact-phrase
//! content, then prefix content, then a plain substring sweep. Raw mode
//! passes the query to FTS5 untouched.

use rusqlite::params;

use super::{Store, StoreResult};

/// One search result
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub path: String,
    pub kind: String,
    pub snippet: Option<String>,
}

/// Operators that mark a query as raw FTS5 syntax
fn has_fts_operators(query: &str) -> bool {
    ["\"", "*", "^", " AND ", " OR ", " NOT ", "NEAR"]
        .iter()
        .any(|op| query.contains(op))
}

impl Store {
    /// Search artifacts. Returns `(hits, method)` where `method` names the
    /// expansion step that produced the results.
    pub fn full_text_search(
        &self,
        query: &str,
        limit: usize,
        raw_fts: bool,
    ) -> StoreResult<(Vec<SearchHit>, &'static str)> {
        if raw_fts || has_fts_operators(query) {
            return Ok((self.search_fts(query, limit), "fts_raw"));
        }

        let hits = self.search_path_substring(query, limit)?;
        if !hits.is_empty() {
            return Ok((hits, "path_substring"));
        }

        let hits = self.search_fts(&format!("\"{}\"", query.replace('"', "")), limit);
        if !hits.is_empty() {
            return Ok((hits, "fts_exact"));
        }

        let hits = self.search_fts(&format!("{}*", query.replace('"', "")), limit);
        if !hits.is_empty() {
            return Ok((hits, "fts_prefix"));
        }

        Ok((self.search_like(query, limit)?, "like_full"))
    }

    /// FTS5 query. Syntax errors from user queries are not fatal; they just
    /// produce no hits and the caller falls through to LIKE.
    fn search_fts(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let conn = self.conn();
        let mut stmt = match conn.prepare(
            "SELECT a.path, a.kind, snippet(artifacts_fts, 1, '>>>', '<<<', '...', 30)
             FROM artifacts_fts
             JOIN artifacts a ON artifacts_fts.rowid = a.id
             WHERE artifacts_fts MATCH ?1
             LIMIT ?2",
        ) {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        let rows = stmt.query_map(params![query, limit as i64], |row| {
            Ok(SearchHit {
                path: row.get(0)?,
                kind: row.get(1)?,
                snippet: row.get(2)?,
            })
        });
        match rows {
            Ok(rows) => rows.filter_map(std::result::Result::ok).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn search_path_substring(&self, query: &str, limit: usize) -> StoreResult<Vec<SearchHit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, kind, substr(text_content, 1, 100)
             FROM artifacts
             WHERE path LIKE ?1
             ORDER BY path
             LIMIT ?2",
        )?;
        let pattern = format!("%{}%", query);
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(SearchHit {
                    path: row.get(0)?,
                    kind: row.get(1)?,
                    snippet: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn search_like(&self, query: &str, limit: usize) -> StoreResult<Vec<SearchHit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, kind, substr(text_content, 1, 100)
             FROM artifacts
             WHERE path LIKE ?1 OR text_content LIKE ?1
             ORDER BY CASE WHEN path LIKE ?1 THEN 0 ELSE 1 END, path
             LIMIT ?2",
        )?;
        let pattern = format!("%{}%", query);
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(SearchHit {
                    path: row.get(0)?,
                    kind: row.get(1)?,
                    snippet: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactRecord;

    fn seeded_store() -> (tempfile::TempDir, Store) {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("t.db")).unwrap();
        store
            .upsert_artifact(&ArtifactRecord {
                kind: "job",
                path: "procs/bkfnds1.procs",
                original_path: None,
                sha256: Some("a"),
                mtime: 1.0,
                size: 30,
                text_content: Some("CID : bkfn\n__Shell Script: /home/master/bkfnds1_process.sh"),
            })
            .unwrap();
        store
            .upsert_artifact(&ArtifactRecord {
                kind: "control",
                path: "control/wccudl.control",
                original_path: None,
                sha256: Some("b"),
                mtime: 1.0,
                size: 25,
                text_content: Some("format_dfa=\"WCCUDL014\""),
            })
            .unwrap();
        (tmp, store)
    }

    #[test]
    fn test_path_substring_wins_first() {
        let (_tmp, store) = seeded_store();
        let (hits, method) = store.full_text_search("bkfnds", 10, false).unwrap();
        assert_eq!(method, "path_substring");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "procs/bkfnds1.procs");
    }

    #[test]
    fn test_content_fallback() {
        let (_tmp, store) = seeded_store();
        let (hits, method) = store.full_text_search("WCCUDL014", 10, false).unwrap();
        assert!(!hits.is_empty(), "content-only token must still be found");
        assert_ne!(method, "path_substring");
    }

    #[test]
    fn test_no_results_is_not_an_error() {
        let (_tmp, store) = seeded_store();
        let (hits, _method) = store.full_text_search("zzz_nothing", 10, false).unwrap();
        assert!(hits.is_empty());
    }
}
