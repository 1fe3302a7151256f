mod helpers;

use engram::db;
use rusqlite::Connection;
use std::path::PathBuf;

/// Build a database file shaped like the v1 binary left it: no scope or
/// idempotency columns on memories, single-column ledger primary key.
fn create_legacy_db(path: &PathBuf) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_accessed TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 1,
            strength REAL NOT NULL DEFAULT 1.0
        );
        INSERT INTO memories (id, content, created_at, updated_at, last_accessed)
            VALUES ('legacy-1', 'kept across migration',
                    '2025-06-01T00:00:00+00:00', '2025-06-01T00:00:00+00:00',
                    '2025-06-01T00:00:00+00:00');
        CREATE TABLE idempotency_ledger (
            key TEXT PRIMARY KEY,
            operation TEXT,
            scope_id TEXT,
            result TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        INSERT INTO idempotency_ledger (key, operation, scope_id, result, created_at)
            VALUES ('old-key', 'remember', NULL, '{"id":"legacy-1","status":"created"}',
                    '2025-06-01T00:00:00+00:00');
        INSERT INTO idempotency_ledger (key, operation, scope_id, result, created_at)
            VALUES ('scoped-key', 'remember', 'proj', '{"id":"legacy-2","status":"created"}',
                    '2025-06-01T00:00:00+00:00');
        CREATE TABLE schema_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
        INSERT INTO schema_meta (key, value) VALUES ('schema_version', '1');
        "#,
    )
    .unwrap();
}

fn temp_db_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "engram-migration-{name}-{}.db",
        uuid::Uuid::now_v7()
    ))
}

#[test]
fn legacy_database_upgrades_without_losing_rows() {
    let path = temp_db_path("upgrade");
    create_legacy_db(&path);

    let conn = db::open_database(&path).unwrap();

    // Rows survived
    let content: String = conn
        .query_row(
            "SELECT content FROM memories WHERE id = 'legacy-1'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(content, "kept across migration");

    // Full current column set is queryable
    let (scope_id, key, embedding): (Option<String>, Option<String>, Option<Vec<u8>>) = conn
        .query_row(
            "SELECT scope_id, idempotency_key, embedding FROM memories WHERE id = 'legacy-1'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert!(scope_id.is_none());
    assert!(key.is_none());
    assert!(embedding.is_none());

    // Ledger was rebuilt with the composite key, sentinel applied
    let scope_key: String = conn
        .query_row(
            "SELECT scope_key FROM idempotency_ledger WHERE key = 'old-key'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(scope_key, "__global__");
    let scoped: String = conn
        .query_row(
            "SELECT scope_key FROM idempotency_ledger WHERE key = 'scoped-key'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(scoped, "proj");

    assert_eq!(
        db::migrations::get_schema_version(&conn).unwrap(),
        db::migrations::CURRENT_SCHEMA_VERSION
    );

    // Pre-existing rows were backfilled into the new FTS index
    let fts_hit: String = conn
        .query_row(
            "SELECT id FROM memories_fts WHERE memories_fts MATCH 'migration'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(fts_hit, "legacy-1");

    drop(conn);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn migrated_ledger_still_replays() {
    let path = temp_db_path("replay");
    create_legacy_db(&path);

    let conn = db::open_database(&path).unwrap();
    let config = helpers::test_config();

    // A replay against the migrated global-scope ledger row returns the old id
    let response = engram::memory::remember::remember(
        &conn,
        None,
        &config,
        &engram::memory::remember::RememberInput {
            content: "retry of an old write".into(),
            idempotency_key: Some("old-key".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(response.id, "legacy-1");

    drop(conn);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn reopening_current_database_is_stable() {
    let path = temp_db_path("reopen");

    {
        let conn = db::open_database(&path).unwrap();
        conn.execute(
            "INSERT INTO memories (id, content, created_at, updated_at, last_accessed) \
             VALUES ('m1', 'row', '2026-01-01T00:00:00+00:00', \
             '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);

    drop(conn);
    let _ = std::fs::remove_file(&path);
}
