//! SQLite schema for the per-snapshot store
//!
//! One database per snapshot under `.strata/strata.db`. All DDL is
//! `IF NOT EXISTS` so opening an existing store is a no-op.

pub const SCHEMA: &str = "
-- Artifacts: files indexed from the snapshot
CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,  -- 'job', 'script', 'control', 'insert', 'docdef', 'other'
    path TEXT NOT NULL UNIQUE,  -- snapshot-relative path
    original_path TEXT,  -- original unix path if different
    sha256 TEXT,  -- nullable, computed only for text files
    mtime REAL NOT NULL,
    size INTEGER NOT NULL,
    text_content TEXT  -- nullable, only for small UTF-8 files
);

-- Parsed job declarations
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL,
    parsed_json TEXT NOT NULL,
    sha256 TEXT
);

-- Graph nodes
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,  -- 'job', 'script', 'control', 'docdef'
    key TEXT NOT NULL,
    display_name TEXT NOT NULL,
    canonical_path TEXT,  -- snapshot-relative path, NULL for stubs
    original_path TEXT,
    confidence REAL DEFAULT 1.0,
    UNIQUE(type, key)
);

-- Graph edges
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY,
    src INTEGER NOT NULL REFERENCES nodes(id),
    dst INTEGER NOT NULL REFERENCES nodes(id),
    rel_type TEXT NOT NULL,  -- 'RUNS', 'READS', 'CALLS', 'REFERS_TO'
    confidence REAL DEFAULT 1.0,
    evidence_json TEXT,  -- {file, line_no, line_text}
    source_artifact TEXT,  -- declaring artifact path, for re-derivation
    UNIQUE(src, dst, rel_type)
);

-- Message code knowledge base
CREATE TABLE IF NOT EXISTS message_codes (
    code TEXT PRIMARY KEY,
    severity TEXT NOT NULL,  -- 'I', 'W', 'E', 'F'
    title TEXT,
    body TEXT NOT NULL,
    source_path TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Case cards from resolved debugging history
CREATE TABLE IF NOT EXISTS case_cards (
    id INTEGER PRIMARY KEY,
    content_hash TEXT NOT NULL UNIQUE,
    source_path TEXT,
    title TEXT,
    signals_json TEXT,
    root_cause TEXT,
    fix_summary TEXT,
    verify_commands_json TEXT,
    related_files_json TEXT,
    tags_json TEXT,
    created_at TEXT NOT NULL
);

-- Incidents: one row per analyzed log path
CREATE TABLE IF NOT EXISTS incidents (
    id INTEGER PRIMARY KEY,
    log_path TEXT NOT NULL UNIQUE,
    top_node_key TEXT,
    confidence REAL,
    hypotheses_json TEXT,
    similar_cases_json TEXT,
    analysis_json TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_artifacts_kind ON artifacts(kind);
CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
CREATE INDEX IF NOT EXISTS idx_nodes_key ON nodes(key);
CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src);
CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst);
CREATE INDEX IF NOT EXISTS idx_edges_source_artifact ON edges(source_artifact);
CREATE INDEX IF NOT EXISTS idx_case_cards_hash ON case_cards(content_hash);
CREATE INDEX IF NOT EXISTS idx_incidents_log_path ON incidents(log_path);

-- Full-text search over text-bearing artifacts
CREATE VIRTUAL TABLE IF NOT EXISTS artifacts_fts USING fts5(
    path,
    text_content,
    content=artifacts,
    content_rowid=id
);

CREATE TRIGGER IF NOT EXISTS artifacts_ai AFTER INSERT ON artifacts
WHEN NEW.text_content IS NOT NULL
BEGIN
    INSERT INTO artifacts_fts(rowid, path, text_content)
    VALUES (NEW.id, NEW.path, NEW.text_content);
END;

CREATE TRIGGER IF NOT EXISTS artifacts_ad AFTER DELETE ON artifacts
WHEN OLD.text_content IS NOT NULL
BEGIN
    INSERT INTO artifacts_fts(artifacts_fts, rowid, path, text_content)
    VALUES ('delete', OLD.id, OLD.path, OLD.text_content);
END;

CREATE TRIGGER IF NOT EXISTS artifacts_au AFTER UPDATE ON artifacts
WHEN OLD.text_content IS NOT NULL OR NEW.text_content IS NOT NULL
BEGIN
    INSERT INTO artifacts_fts(artifacts_fts, rowid, path, text_content)
    VALUES ('delete', OLD.id, OLD.path, COALESCE(OLD.text_content, ''));
    INSERT INTO artifacts_fts(rowid, path, text_content)
    VALUES (NEW.id, NEW.path, COALESCE(NEW.text_content, ''));
END;
";
