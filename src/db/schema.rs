//! SQL DDL for all Engram tables.
//!
//! Defines the `memories` table, its `memories_fts` (FTS5) index with sync
//! triggers, the `idempotency_ledger`, the `metrics` ledger, `schema_meta`,
//! and the reserved `work_items` tables. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for Engram's core tables.
const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    category TEXT,
    scope_id TEXT,
    chat_id TEXT,
    thread_id TEXT,
    task_id TEXT,
    metadata TEXT,
    idempotency_key TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 1,
    strength REAL NOT NULL DEFAULT 1.0 CHECK(strength >= 0.0 AND strength <= 1.0),
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_memories_scope ON memories(scope_id);
CREATE INDEX IF NOT EXISTS idx_memories_idempotency ON memories(idempotency_key);
CREATE INDEX IF NOT EXISTS idx_memories_strength ON memories(strength);
CREATE INDEX IF NOT EXISTS idx_memories_last_accessed ON memories(last_accessed);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);

-- Full-text search (BM25), kept in sync by triggers on the content table
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    id UNINDEXED,
    content='memories',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memories_fts_insert AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, content, id) VALUES (new.rowid, new.content, new.id);
END;

CREATE TRIGGER IF NOT EXISTS memories_fts_delete AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, id)
    VALUES ('delete', old.rowid, old.content, old.id);
END;

CREATE TRIGGER IF NOT EXISTS memories_fts_update AFTER UPDATE OF content ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, content, id)
    VALUES ('delete', old.rowid, old.content, old.id);
    INSERT INTO memories_fts(rowid, content, id) VALUES (new.rowid, new.content, new.id);
END;

-- Idempotency ledger: one cached result per (key, operation, scope).
-- Unscoped writes use the '__global__' sentinel as their scope_key.
CREATE TABLE IF NOT EXISTS idempotency_ledger (
    key TEXT NOT NULL,
    operation TEXT NOT NULL,
    scope_key TEXT NOT NULL DEFAULT '__global__',
    result TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (key, operation, scope_key)
);

-- Append-only per-session observability ledger
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    session_id TEXT,
    event TEXT NOT NULL CHECK(event IN ('remember','recall','forget','upsert')),
    memory_id TEXT,
    query TEXT,
    result_count INTEGER,
    was_fallback INTEGER
);

CREATE INDEX IF NOT EXISTS idx_metrics_session ON metrics(session_id);
CREATE INDEX IF NOT EXISTS idx_metrics_event ON metrics(event);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Reserved: work-items surface (schema only, behavior deferred)
CREATE TABLE IF NOT EXISTS work_items (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    scope_id TEXT,
    payload TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS work_item_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_item_id TEXT NOT NULL REFERENCES work_items(id) ON DELETE CASCADE,
    event TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present. Migrations inspect
    // the actual table shapes, so a fresh database passes through them as
    // no-ops on its way to the current version.
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"idempotency_ledger".to_string()));
        assert!(tables.contains(&"metrics".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
        assert!(tables.contains(&"work_items".to_string()));
        assert!(tables.contains(&"work_item_events".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn fts_triggers_track_inserts_and_deletes() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, created_at, updated_at, last_accessed) \
             VALUES ('m1', 'quantum computing basics', '2026-01-01T00:00:00Z', \
             '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let hit: String = conn
            .query_row(
                "SELECT id FROM memories_fts WHERE memories_fts MATCH 'quantum'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hit, "m1");

        conn.execute("DELETE FROM memories WHERE id = 'm1'", [])
            .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'quantum'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn fts_trigger_tracks_content_update() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, created_at, updated_at, last_accessed) \
             VALUES ('m1', 'original topic', '2026-01-01T00:00:00Z', \
             '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "UPDATE memories SET content = 'replacement topic' WHERE id = 'm1'",
            [],
        )
        .unwrap();

        let old_hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'original'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(old_hits, 0);

        let new_hit: String = conn
            .query_row(
                "SELECT id FROM memories_fts WHERE memories_fts MATCH 'replacement'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(new_hit, "m1");
    }
}
