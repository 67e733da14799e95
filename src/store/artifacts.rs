//! Artifact and parsed-job persistence

use rusqlite::{params, OptionalExtension};

use super::{Store, StoreResult};

/// Input record for an artifact upsert
#[derive(Debug, Clone)]
pub struct ArtifactRecord<'a> {
    pub kind: &'a str,
    pub path: &'a str,
    pub original_path: Option<&'a str>,
    pub sha256: Option<&'a str>,
    pub mtime: f64,
    pub size: i64,
    pub text_content: Option<&'a str>,
}

/// Stored artifact row (text content included when present)
#[derive(Debug, Clone)]
pub struct ArtifactRow {
    pub id: i64,
    pub kind: String,
    pub path: String,
    pub sha256: Option<String>,
    pub text_content: Option<String>,
}

impl Store {
    /// Upsert an artifact by path. One transaction per artifact so a crash
    /// leaves either the old or the new row, never a torn one.
    pub fn upsert_artifact(&self, rec: &ArtifactRecord<'_>) -> StoreResult<i64> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM artifacts WHERE path = ?1",
                params![rec.path],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE artifacts
                     SET kind = ?1, original_path = ?2, sha256 = ?3, mtime = ?4,
                         size = ?5, text_content = ?6
                     WHERE id = ?7",
                    params![
                        rec.kind,
                        rec.original_path,
                        rec.sha256,
                        rec.mtime,
                        rec.size,
                        rec.text_content,
                        id
                    ],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO artifacts (kind, path, original_path, sha256, mtime, size, text_content)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        rec.kind,
                        rec.path,
                        rec.original_path,
                        rec.sha256,
                        rec.mtime,
                        rec.size,
                        rec.text_content
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    /// Stored content hash for an artifact path, if the row exists
    pub fn artifact_sha(&self, path: &str) -> StoreResult<Option<String>> {
        let conn = self.conn();
        let sha: Option<Option<String>> = conn
            .query_row(
                "SELECT sha256 FROM artifacts WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(sha.flatten())
    }

    /// All artifacts of one kind, path-ordered
    pub fn artifacts_by_kind(&self, kind: &str) -> StoreResult<Vec<ArtifactRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, kind, path, sha256, text_content
             FROM artifacts WHERE kind = ?1 ORDER BY path",
        )?;
        let rows = stmt
            .query_map(params![kind], |row| {
                Ok(ArtifactRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    path: row.get(2)?,
                    sha256: row.get(3)?,
                    text_content: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Artifacts of one kind whose path contains the given fragment
    /// (case-insensitive), path-ordered
    pub fn artifacts_by_kind_path_like(
        &self,
        kind: &str,
        fragment: &str,
    ) -> StoreResult<Vec<ArtifactRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, kind, path, sha256, text_content
             FROM artifacts
             WHERE kind = ?1 AND UPPER(path) LIKE UPPER(?2)
             ORDER BY path",
        )?;
        let pattern = format!("%{}%", fragment);
        let rows = stmt
            .query_map(params![kind, pattern], |row| {
                Ok(ArtifactRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    path: row.get(2)?,
                    sha256: row.get(3)?,
                    text_content: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Artifact counts grouped by kind
    pub fn count_artifacts_by_kind(&self) -> StoreResult<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT kind, COUNT(*) FROM artifacts GROUP BY kind ORDER BY kind")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Upsert a parsed job declaration by name
    pub fn upsert_job(
        &self,
        name: &str,
        path: &str,
        parsed_json: &str,
        sha256: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO jobs (name, path, parsed_json, sha256)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE
             SET path = excluded.path,
                 parsed_json = excluded.parsed_json,
                 sha256 = excluded.sha256",
            params![name, path, parsed_json, sha256],
        )?;
        Ok(())
    }

    /// Parsed declaration JSON for one job
    pub fn job_parsed(&self, name: &str) -> StoreResult<Option<String>> {
        let conn = self.conn();
        let parsed = conn
            .query_row(
                "SELECT parsed_json FROM jobs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(parsed)
    }

    /// All (name, parsed_json) pairs, name-ordered
    pub fn jobs_parsed(&self) -> StoreResult<Vec<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name, parsed_json FROM jobs ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_jobs(&self) -> StoreResult<i64> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, Store) {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("t.db")).unwrap();
        (tmp, store)
    }

    #[test]
    fn test_artifact_upsert_replaces_in_place() {
        let (_tmp, store) = test_store();
        let first = store
            .upsert_artifact(&ArtifactRecord {
                kind: "job",
                path: "procs/bkfnds1.procs",
                original_path: None,
                sha256: Some("aaa"),
                mtime: 1.0,
                size: 10,
                text_content: Some("CID : bkfn"),
            })
            .unwrap();
        let second = store
            .upsert_artifact(&ArtifactRecord {
                kind: "job",
                path: "procs/bkfnds1.procs",
                original_path: None,
                sha256: Some("bbb"),
                mtime: 2.0,
                size: 12,
                text_content: Some("CID : bkfn\nupdated"),
            })
            .unwrap();
        assert_eq!(first, second, "upsert must keep the same row id");
        assert_eq!(
            store.artifact_sha("procs/bkfnds1.procs").unwrap().as_deref(),
            Some("bbb")
        );
    }

    #[test]
    fn test_job_upsert_by_name() {
        let (_tmp, store) = test_store();
        store.upsert_job("bkfnds1", "procs/bkfnds1.procs", "{}", None).unwrap();
        store
            .upsert_job("bkfnds1", "procs/bkfnds1.procs", "{\"cid\":\"bkfn\"}", Some("x"))
            .unwrap();
        assert_eq!(store.count_jobs().unwrap(), 1);
        assert_eq!(
            store.job_parsed("bkfnds1").unwrap().as_deref(),
            Some("{\"cid\":\"bkfn\"}")
        );
    }
}
