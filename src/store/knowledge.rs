//! Message-code knowledge base and case-card persistence
//!
//! Both tables are fed by import collaborators: message codes come from a
//! pre-extracted code listing, case cards from pre-extracted debugging
//! history. Severity is parsed from the code's trailing letter exactly once,
//! at ingestion.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::parse::Severity;

use super::{Store, StoreResult};

/// A decoded legacy message code
#[derive(Debug, Clone)]
pub struct MessageCode {
    pub code: String,
    pub severity: Severity,
    pub title: Option<String>,
    pub body: String,
    pub source_path: String,
}

/// Input record for a case-card import
#[derive(Debug, Clone)]
pub struct CaseCardRecord {
    pub content_hash: String,
    pub source_path: Option<String>,
    pub title: Option<String>,
    pub signals: Vec<String>,
    pub root_cause: Option<String>,
    pub fix_summary: Option<String>,
    pub verify_commands: Vec<String>,
    pub related_files: Vec<String>,
    pub tags: Vec<String>,
}

/// Stored case card
#[derive(Debug, Clone)]
pub struct CaseCardRow {
    pub id: i64,
    pub content_hash: String,
    pub source_path: Option<String>,
    pub title: Option<String>,
    pub signals: Vec<String>,
    pub root_cause: Option<String>,
    pub fix_summary: Option<String>,
    pub verify_commands: Vec<String>,
}

fn json_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or_default()
}

impl Store {
    /// Upsert a message code (keyed by code)
    pub fn upsert_message_code(&self, code: &MessageCode) -> StoreResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO message_codes (code, severity, title, body, source_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(code) DO UPDATE
             SET severity = excluded.severity,
                 title = excluded.title,
                 body = excluded.body,
                 source_path = excluded.source_path",
            params![
                code.code,
                code.severity.letter().to_string(),
                code.title,
                code.body,
                code.source_path,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch several message codes at once, keyed by code
    pub fn message_codes_batch(
        &self,
        codes: &[String],
    ) -> StoreResult<BTreeMap<String, MessageCode>> {
        let mut out = BTreeMap::new();
        if codes.is_empty() {
            return Ok(out);
        }
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT code, severity, title, body, source_path FROM message_codes WHERE code = ?1",
        )?;
        for code in codes {
            let row = stmt
                .query_row(params![code], |row| {
                    let letter: String = row.get(1)?;
                    Ok(MessageCode {
                        code: row.get(0)?,
                        severity: letter
                            .chars()
                            .next()
                            .and_then(Severity::from_letter)
                            .unwrap_or(Severity::Info),
                        title: row.get(2)?,
                        body: row.get(3)?,
                        source_path: row.get(4)?,
                    })
                })
                .optional()?;
            if let Some(decoded) = row {
                out.insert(decoded.code.clone(), decoded);
            }
        }
        Ok(out)
    }

    pub fn count_message_codes(&self) -> StoreResult<i64> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM message_codes", [], |row| row.get(0))?)
    }

    /// Insert a case card unless its content hash is already present.
    /// Returns `(id, inserted)`; unchanged source content never re-imports.
    pub fn upsert_case_card(&self, card: &CaseCardRecord) -> StoreResult<(i64, bool)> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM case_cards WHERE content_hash = ?1",
                params![card.content_hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            tx.commit()?;
            return Ok((id, false));
        }

        tx.execute(
            "INSERT INTO case_cards (content_hash, source_path, title, signals_json, root_cause,
                                     fix_summary, verify_commands_json, related_files_json,
                                     tags_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                card.content_hash,
                card.source_path,
                card.title,
                serde_json::to_string(&card.signals).unwrap_or_default(),
                card.root_cause,
                card.fix_summary,
                serde_json::to_string(&card.verify_commands).unwrap_or_default(),
                serde_json::to_string(&card.related_files).unwrap_or_default(),
                serde_json::to_string(&card.tags).unwrap_or_default(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((id, true))
    }

    /// All case cards, insertion-ordered (newest last)
    pub fn list_case_cards(&self) -> StoreResult<Vec<CaseCardRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, content_hash, source_path, title, signals_json, root_cause,
                    fix_summary, verify_commands_json
             FROM case_cards ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let signals_json: Option<String> = row.get(4)?;
                let verify_json: Option<String> = row.get(7)?;
                Ok(CaseCardRow {
                    id: row.get(0)?,
                    content_hash: row.get(1)?,
                    source_path: row.get(2)?,
                    title: row.get(3)?,
                    signals: json_list(&signals_json),
                    root_cause: row.get(5)?,
                    fix_summary: row.get(6)?,
                    verify_commands: json_list(&verify_json),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_case_cards(&self) -> StoreResult<i64> {
        let conn = self.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM case_cards", [], |row| row.get(0))?)
    }
}
