//! Forward-only, additive schema migrations.
//!
//! Tracks the schema version in `schema_meta` and inspects column and
//! primary-key metadata to upgrade older databases in place: `ADD COLUMN` for
//! missing nullable columns, and a rebuild-as-new-table for the idempotency
//! ledger's composite primary key change.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// The ledger scope discriminator for unscoped writes.
pub const GLOBAL_SCOPE_KEY: &str = "__global__";

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(
        schema_version = version,
        target = CURRENT_SCHEMA_VERSION,
        "checking migrations"
    );

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Add any memory columns an older database is missing. Safe to run on every
/// open; does nothing when the table does not exist yet.
pub fn ensure_memory_columns(conn: &Connection) -> rusqlite::Result<()> {
    if !table_exists(conn, "memories")? {
        return Ok(());
    }

    const ADDITIVE_COLUMNS: &[(&str, &str)] = &[
        ("category", "TEXT"),
        ("scope_id", "TEXT"),
        ("chat_id", "TEXT"),
        ("thread_id", "TEXT"),
        ("task_id", "TEXT"),
        ("metadata", "TEXT"),
        ("idempotency_key", "TEXT"),
        ("embedding", "BLOB"),
    ];

    for (name, decl) in ADDITIVE_COLUMNS {
        if !has_column(conn, "memories", name)? {
            tracing::info!(column = name, "adding missing memories column");
            conn.execute(
                &format!("ALTER TABLE memories ADD COLUMN {name} {decl}"),
                [],
            )?;
        }
    }

    Ok(())
}

/// Migration v1 → v2: rebuild the idempotency ledger with its composite
/// primary key `(key, operation, scope_key)`.
///
/// Older databases keyed the ledger on `key` alone with a nullable `scope_id`
/// column. Rows are copied with `scope_key = coalesce(scope_id, '__global__')`
/// inside one transaction. No-op when the ledger already has the composite key.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    // Rows that predate the FTS table are not in the index yet; 'rebuild'
    // repopulates it from the content table. Harmless on an empty store.
    if table_exists(conn, "memories_fts")? {
        conn.execute(
            "INSERT INTO memories_fts(memories_fts) VALUES('rebuild')",
            [],
        )?;
    }

    if !table_exists(conn, "idempotency_ledger")? || ledger_has_composite_pk(conn)? {
        return Ok(());
    }

    let operation_expr = if has_column(conn, "idempotency_ledger", "operation")? {
        "coalesce(operation, 'remember')"
    } else {
        "'remember'"
    };
    let scope_expr = if has_column(conn, "idempotency_ledger", "scope_id")? {
        "coalesce(scope_id, '__global__')"
    } else {
        "'__global__'"
    };

    let sql = format!(
        r#"
BEGIN;
CREATE TABLE idempotency_ledger_new (
    key TEXT NOT NULL,
    operation TEXT NOT NULL,
    scope_key TEXT NOT NULL DEFAULT '__global__',
    result TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (key, operation, scope_key)
);
INSERT INTO idempotency_ledger_new (key, operation, scope_key, result, created_at)
    SELECT key, {operation_expr}, {scope_expr}, result, created_at
    FROM idempotency_ledger;
DROP TABLE idempotency_ledger;
ALTER TABLE idempotency_ledger_new RENAME TO idempotency_ledger;
COMMIT;
"#
    );
    conn.execute_batch(&sql)?;

    tracing::info!("rebuilt idempotency ledger with composite primary key");
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `true` when more than one ledger column participates in the primary key.
fn ledger_has_composite_pk(conn: &Connection) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("PRAGMA table_info(idempotency_ledger)")?;
    let pk_count = stmt
        .query_map([], |row| row.get::<_, i64>(5))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|pk| *pk > 0)
        .count();
    Ok(pk_count > 1)
}
