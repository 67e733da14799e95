//! Node and edge persistence
//!
//! Nodes are upserted by `(type, key)`; a stub created during reference
//! resolution is upgraded in place when its defining artifact is later
//! scanned. Edges are upserted by `(src, dst, rel_type)` and carry the
//! declaring artifact path so a changed artifact's derived edges can be
//! removed and re-derived.

use rusqlite::{params, OptionalExtension, Row};

use super::{Store, StoreResult};

/// Graph node types. The set is closed; everything a job touches is one of
/// these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Job,
    Script,
    Control,
    Docdef,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Job => "job",
            NodeType::Script => "script",
            NodeType::Control => "control",
            NodeType::Docdef => "docdef",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "job" => Some(NodeType::Job),
            "script" => Some(NodeType::Script),
            "control" => Some(NodeType::Control),
            "docdef" => Some(NodeType::Docdef),
            _ => None,
        }
    }
}

/// Directed relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelKind {
    Runs,
    Reads,
    Calls,
    RefersTo,
}

impl RelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelKind::Runs => "RUNS",
            RelKind::Reads => "READS",
            RelKind::Calls => "CALLS",
            RelKind::RefersTo => "REFERS_TO",
        }
    }
}

/// Stored node row
#[derive(Debug, Clone)]
pub struct NodeRow {
    pub id: i64,
    pub node_type: String,
    pub key: String,
    pub display_name: String,
    pub canonical_path: Option<String>,
    pub original_path: Option<String>,
    pub confidence: f64,
}

impl NodeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(NodeRow {
            id: row.get(0)?,
            node_type: row.get(1)?,
            key: row.get(2)?,
            display_name: row.get(3)?,
            canonical_path: row.get(4)?,
            original_path: row.get(5)?,
            confidence: row.get(6)?,
        })
    }
}

const NODE_COLS: &str = "id, type, key, display_name, canonical_path, original_path, confidence";

/// An edge with the node on its far end resolved
#[derive(Debug, Clone)]
pub struct EdgeNeighbor {
    pub rel_type: String,
    pub confidence: f64,
    pub evidence_json: Option<String>,
    pub node: NodeRow,
}

/// Flat edge listing used by status and idempotence checks
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDump {
    pub src_key: String,
    pub dst_key: String,
    pub rel_type: String,
    pub confidence: f64,
    pub source_artifact: Option<String>,
}

impl Store {
    /// Upsert a node by `(type, key)`.
    ///
    /// An existing stub (no canonical path) is upgraded in place when the
    /// new data carries one; an existing defined node is left untouched.
    pub fn upsert_node(
        &self,
        node_type: NodeType,
        key: &str,
        display_name: &str,
        canonical_path: Option<&str>,
        original_path: Option<&str>,
        confidence: f64,
    ) -> StoreResult<i64> {
        let conn = self.conn();

        let existing: Option<(i64, Option<String>)> = conn
            .query_row(
                "SELECT id, canonical_path FROM nodes WHERE type = ?1 AND key = ?2",
                params![node_type.as_str(), key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, existing_canonical)) = existing {
            if existing_canonical.is_none() && canonical_path.is_some() {
                conn.execute(
                    "UPDATE nodes
                     SET display_name = ?1, canonical_path = ?2, original_path = ?3, confidence = ?4
                     WHERE id = ?5",
                    params![display_name, canonical_path, original_path, confidence, id],
                )?;
            }
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO nodes (type, key, display_name, canonical_path, original_path, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                node_type.as_str(),
                key,
                display_name,
                canonical_path,
                original_path,
                confidence
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn node_by_key(&self, node_type: NodeType, key: &str) -> StoreResult<Option<NodeRow>> {
        let conn = self.conn();
        let node = conn
            .query_row(
                &format!("SELECT {NODE_COLS} FROM nodes WHERE type = ?1 AND key = ?2"),
                params![node_type.as_str(), key],
                NodeRow::from_row,
            )
            .optional()?;
        Ok(node)
    }

    pub fn node_by_id(&self, id: i64) -> StoreResult<Option<NodeRow>> {
        let conn = self.conn();
        let node = conn
            .query_row(
                &format!("SELECT {NODE_COLS} FROM nodes WHERE id = ?1"),
                params![id],
                NodeRow::from_row,
            )
            .optional()?;
        Ok(node)
    }

    /// All nodes of one type, key-ordered for determinism
    pub fn nodes_by_type(&self, node_type: NodeType) -> StoreResult<Vec<NodeRow>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {NODE_COLS} FROM nodes WHERE type = ?1 ORDER BY key"))?;
        let rows = stmt
            .query_map(params![node_type.as_str()], NodeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Nodes of one type whose key starts with the given prefix, key-ordered
    pub fn nodes_by_key_prefix(
        &self,
        node_type: NodeType,
        prefix: &str,
    ) -> StoreResult<Vec<NodeRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLS} FROM nodes WHERE type = ?1 AND key LIKE ?2 ORDER BY key"
        ))?;
        let pattern = format!("{}%", prefix.replace('%', ""));
        let rows = stmt
            .query_map(params![node_type.as_str(), pattern], NodeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Upsert an edge by `(src, dst, rel_type)`, idempotently merged
    pub fn upsert_edge(
        &self,
        src: i64,
        dst: i64,
        rel_type: RelKind,
        confidence: f64,
        evidence_json: Option<&str>,
        source_artifact: Option<&str>,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM edges WHERE src = ?1 AND dst = ?2 AND rel_type = ?3",
                params![src, dst, rel_type.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO edges (src, dst, rel_type, confidence, evidence_json, source_artifact)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                src,
                dst,
                rel_type.as_str(),
                confidence,
                evidence_json,
                source_artifact
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Remove every edge derived from the given artifact (re-scan of a
    /// changed file re-derives them)
    pub fn remove_edges_from_artifact(&self, path: &str) -> StoreResult<usize> {
        let conn = self.conn();
        let removed = conn.execute(
            "DELETE FROM edges WHERE source_artifact = ?1",
            params![path],
        )?;
        Ok(removed)
    }

    /// Outgoing edges of a node with destination nodes resolved
    pub fn edges_from(&self, node_id: i64) -> StoreResult<Vec<EdgeNeighbor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.rel_type, e.confidence, e.evidence_json,
                    n.id, n.type, n.key, n.display_name, n.canonical_path, n.original_path, n.confidence
             FROM edges e JOIN nodes n ON e.dst = n.id
             WHERE e.src = ?1
             ORDER BY e.rel_type, n.key",
        )?;
        let rows = stmt
            .query_map(params![node_id], |row| {
                Ok(EdgeNeighbor {
                    rel_type: row.get(0)?,
                    confidence: row.get(1)?,
                    evidence_json: row.get(2)?,
                    node: NodeRow {
                        id: row.get(3)?,
                        node_type: row.get(4)?,
                        key: row.get(5)?,
                        display_name: row.get(6)?,
                        canonical_path: row.get(7)?,
                        original_path: row.get(8)?,
                        confidence: row.get(9)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Incoming edges of a node with source nodes resolved
    pub fn edges_to(&self, node_id: i64) -> StoreResult<Vec<EdgeNeighbor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.rel_type, e.confidence, e.evidence_json,
                    n.id, n.type, n.key, n.display_name, n.canonical_path, n.original_path, n.confidence
             FROM edges e JOIN nodes n ON e.src = n.id
             WHERE e.dst = ?1
             ORDER BY e.rel_type, n.key",
        )?;
        let rows = stmt
            .query_map(params![node_id], |row| {
                Ok(EdgeNeighbor {
                    rel_type: row.get(0)?,
                    confidence: row.get(1)?,
                    evidence_json: row.get(2)?,
                    node: NodeRow {
                        id: row.get(3)?,
                        node_type: row.get(4)?,
                        key: row.get(5)?,
                        display_name: row.get(6)?,
                        canonical_path: row.get(7)?,
                        original_path: row.get(8)?,
                        confidence: row.get(9)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Outgoing edge count, used by the matching tie-breaker
    pub fn edge_count_from(&self, node_id: i64) -> StoreResult<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE src = ?1",
            params![node_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All nodes, (type, key)-ordered. Used by idempotence checks.
    pub fn all_nodes(&self) -> StoreResult<Vec<NodeRow>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {NODE_COLS} FROM nodes ORDER BY type, key"))?;
        let rows = stmt
            .query_map([], NodeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All edges by natural key, ordered. Used by idempotence checks.
    pub fn all_edges(&self) -> StoreResult<Vec<EdgeDump>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.key, d.key, e.rel_type, e.confidence, e.source_artifact
             FROM edges e
             JOIN nodes s ON e.src = s.id
             JOIN nodes d ON e.dst = d.id
             ORDER BY s.key, d.key, e.rel_type",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EdgeDump {
                    src_key: row.get(0)?,
                    dst_key: row.get(1)?,
                    rel_type: row.get(2)?,
                    confidence: row.get(3)?,
                    source_artifact: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Node counts grouped by type
    pub fn count_nodes_by_type(&self) -> StoreResult<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT type, COUNT(*) FROM nodes GROUP BY type ORDER BY type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Edge counts grouped by relation kind
    pub fn count_edges_by_type(&self) -> StoreResult<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT rel_type, COUNT(*) FROM edges GROUP BY rel_type ORDER BY rel_type")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
