//! Incident persistence
//!
//! One row per distinct log path; re-analysis replaces the row, never
//! appends. The upsert runs in its own transaction.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{Store, StoreResult};

/// Input record for an incident upsert
#[derive(Debug, Clone)]
pub struct IncidentRecord<'a> {
    pub log_path: &'a str,
    pub top_node_key: Option<&'a str>,
    pub confidence: Option<f64>,
    pub hypotheses_json: Option<&'a str>,
    pub similar_cases_json: Option<&'a str>,
    pub analysis_json: Option<&'a str>,
}

/// Stored incident row
#[derive(Debug, Clone)]
pub struct IncidentRow {
    pub id: i64,
    pub log_path: String,
    pub top_node_key: Option<String>,
    pub confidence: Option<f64>,
    pub hypotheses_json: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Store {
    /// Upsert an incident by log path. Returns `(id, inserted)`.
    pub fn upsert_incident(&self, rec: &IncidentRecord<'_>) -> StoreResult<(i64, bool)> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM incidents WHERE log_path = ?1",
                params![rec.log_path],
                |row| row.get(0),
            )
            .optional()?;

        let (id, inserted) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE incidents
                     SET top_node_key = ?1, confidence = ?2, hypotheses_json = ?3,
                         similar_cases_json = ?4, analysis_json = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        rec.top_node_key,
                        rec.confidence,
                        rec.hypotheses_json,
                        rec.similar_cases_json,
                        rec.analysis_json,
                        now,
                        id
                    ],
                )?;
                (id, false)
            }
            None => {
                tx.execute(
                    "INSERT INTO incidents (log_path, top_node_key, confidence, hypotheses_json,
                                            similar_cases_json, analysis_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        rec.log_path,
                        rec.top_node_key,
                        rec.confidence,
                        rec.hypotheses_json,
                        rec.similar_cases_json,
                        rec.analysis_json,
                        now
                    ],
                )?;
                (tx.last_insert_rowid(), true)
            }
        };

        tx.commit()?;
        Ok((id, inserted))
    }

    /// Recent incidents, most recently analyzed first
    pub fn list_incidents(&self, limit: usize) -> StoreResult<Vec<IncidentRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, log_path, top_node_key, confidence, hypotheses_json, created_at, updated_at
             FROM incidents
             ORDER BY COALESCE(updated_at, created_at) DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(IncidentRow {
                    id: row.get(0)?,
                    log_path: row.get(1)?,
                    top_node_key: row.get(2)?,
                    confidence: row.get(3)?,
                    hypotheses_json: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn incident_by_log_path(&self, log_path: &str) -> StoreResult<Option<IncidentRow>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, log_path, top_node_key, confidence, hypotheses_json, created_at, updated_at
                 FROM incidents WHERE log_path = ?1",
                params![log_path],
                |row| {
                    Ok(IncidentRow {
                        id: row.get(0)?,
                        log_path: row.get(1)?,
                        top_node_key: row.get(2)?,
                        confidence: row.get(3)?,
                        hypotheses_json: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn count_incidents(&self) -> StoreResult<i64> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?)
    }
}
