//! Persistence layer for Strata
//!
//! The `Store` wraps one SQLite connection per snapshot database and exposes
//! the repository interface used by every component: idempotent upserts by
//! natural key, typed queries, and full-text search. Each logical entity
//! (artifact, incident, case card) is written in its own transaction so a
//! crash mid-run never leaves a partially-written entity.

mod artifacts;
mod graph_ops;
mod incidents;
mod knowledge;
mod schema;
mod search;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

pub use artifacts::{ArtifactRecord, ArtifactRow};
pub use graph_ops::{EdgeDump, EdgeNeighbor, NodeRow, NodeType, RelKind};
pub use incidents::{IncidentRecord, IncidentRow};
pub use knowledge::{CaseCardRecord, CaseCardRow, MessageCode};
pub use search::SearchHit;

/// Errors from the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-snapshot store handle
///
/// Passed explicitly to every component constructor; there is no ambient
/// global connection.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a store at the given database path
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the store for a snapshot root (`<snapshot>/.strata/strata.db`)
    pub fn open_snapshot(snapshot: &Path) -> StoreResult<Self> {
        Self::open(&crate::config::db_path(snapshot))
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
