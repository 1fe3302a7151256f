//! Storage contract over the `memories` table.
//!
//! All operations are synchronous and either succeed or surface a structured
//! error; the write-ahead log provides crash-consistency. Scope filters
//! AND-compose onto both the FTS path and the vector path.

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::embedding::{from_blob, to_blob};
use crate::error::Result;
use crate::memory::types::{Memory, ScopeFilter, ScopeGuard};

/// Fields for a new memory row. The id and timestamps are assigned on create.
#[derive(Debug, Default)]
pub struct NewMemory<'a> {
    pub content: &'a str,
    pub category: Option<&'a str>,
    pub scope_id: Option<&'a str>,
    pub chat_id: Option<&'a str>,
    pub thread_id: Option<&'a str>,
    pub task_id: Option<&'a str>,
    pub metadata: Option<&'a serde_json::Value>,
    pub idempotency_key: Option<&'a str>,
    pub embedding: Option<&'a [f32]>,
}

/// Replacement fields for an upsert. Omitted optional fields become null.
#[derive(Debug, Default)]
pub struct ContentUpdate<'a> {
    pub content: &'a str,
    pub category: Option<&'a str>,
    pub metadata: Option<&'a serde_json::Value>,
    pub embedding: Option<&'a [f32]>,
}

fn memory_columns(alias: &str) -> String {
    [
        "id",
        "content",
        "category",
        "scope_id",
        "chat_id",
        "thread_id",
        "task_id",
        "metadata",
        "idempotency_key",
        "created_at",
        "updated_at",
        "last_accessed",
        "access_count",
        "strength",
        "embedding",
    ]
    .iter()
    .map(|c| format!("{alias}{c}"))
    .collect::<Vec<_>>()
    .join(", ")
}

fn memory_from_row(row: &Row<'_>, dimensions: usize) -> rusqlite::Result<Memory> {
    let metadata_str: Option<String> = row.get(7)?;
    let blob: Option<Vec<u8>> = row.get(14)?;
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        category: row.get(2)?,
        scope_id: row.get(3)?,
        chat_id: row.get(4)?,
        thread_id: row.get(5)?,
        task_id: row.get(6)?,
        metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
        idempotency_key: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        last_accessed: row.get(11)?,
        access_count: row.get(12)?,
        strength: row.get(13)?,
        // A stale-dimension blob (model change) reads back as no embedding.
        embedding: blob.and_then(|b| from_blob(&b, dimensions)),
    })
}

/// Build AND-composed scope conditions. Each present filter field constrains
/// its column; absent fields are not filtered.
fn scope_clauses<'a>(filter: &'a ScopeFilter, alias: &str) -> (Vec<String>, Vec<&'a dyn ToSql>) {
    let mut clauses = Vec::new();
    let mut values: Vec<&dyn ToSql> = Vec::new();
    if let Some(v) = &filter.scope_id {
        clauses.push(format!("{alias}scope_id = ?"));
        values.push(v);
    }
    if let Some(v) = &filter.chat_id {
        clauses.push(format!("{alias}chat_id = ?"));
        values.push(v);
    }
    if let Some(v) = &filter.thread_id {
        clauses.push(format!("{alias}thread_id = ?"));
        values.push(v);
    }
    if let Some(v) = &filter.task_id {
        clauses.push(format!("{alias}task_id = ?"));
        values.push(v);
    }
    (clauses, values)
}

/// Insert a new memory row with current timestamps and defaults
/// (`access_count = 1`, `strength = 1.0`). Returns the stored record.
pub fn create_memory(conn: &Connection, input: &NewMemory<'_>) -> Result<Memory> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = input
        .metadata
        .map(serde_json::to_string)
        .transpose()?;
    let blob = input.embedding.map(to_blob);

    conn.execute(
        "INSERT INTO memories (id, content, category, scope_id, chat_id, thread_id, task_id, \
         metadata, idempotency_key, created_at, updated_at, last_accessed, access_count, \
         strength, embedding) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?10, 1, 1.0, ?11)",
        params![
            id,
            input.content,
            input.category,
            input.scope_id,
            input.chat_id,
            input.thread_id,
            input.task_id,
            metadata_json,
            input.idempotency_key,
            now,
            blob,
        ],
    )?;

    Ok(Memory {
        id,
        content: input.content.to_string(),
        category: input.category.map(str::to_string),
        scope_id: input.scope_id.map(str::to_string),
        chat_id: input.chat_id.map(str::to_string),
        thread_id: input.thread_id.map(str::to_string),
        task_id: input.task_id.map(str::to_string),
        metadata: input.metadata.cloned(),
        idempotency_key: input.idempotency_key.map(str::to_string),
        created_at: now.clone(),
        updated_at: now.clone(),
        last_accessed: now,
        access_count: 1,
        strength: 1.0,
        embedding: input.embedding.map(<[f32]>::to_vec),
    })
}

pub fn get_memory_by_id(
    conn: &Connection,
    id: &str,
    dimensions: usize,
) -> Result<Option<Memory>> {
    let sql = format!(
        "SELECT {} FROM memories WHERE id = ?1",
        memory_columns("")
    );
    let memory = conn
        .query_row(&sql, params![id], |row| memory_from_row(row, dimensions))
        .optional()?;
    Ok(memory)
}

/// Full replace of content, category, metadata, and embedding, refreshing
/// `updated_at`. Everything else (id, timestamps, counters, scope fields) is
/// preserved. Returns `false` when the id does not exist.
pub fn update_memory_content(
    conn: &Connection,
    id: &str,
    update: &ContentUpdate<'_>,
) -> Result<bool> {
    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = update
        .metadata
        .map(serde_json::to_string)
        .transpose()?;
    let blob = update.embedding.map(to_blob);

    let rows = conn.execute(
        "UPDATE memories SET content = ?1, category = ?2, metadata = ?3, embedding = ?4, \
         updated_at = ?5 WHERE id = ?6",
        params![update.content, update.category, metadata_json, blob, now, id],
    )?;
    Ok(rows > 0)
}

/// Delete a memory by id under a scope guard. The FTS row is removed by the
/// delete trigger. Returns `true` when a row was removed.
pub fn delete_memory(conn: &Connection, id: &str, guard: &ScopeGuard) -> Result<bool> {
    let rows = match guard {
        ScopeGuard::Any => conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?,
        ScopeGuard::Unscoped => conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND scope_id IS NULL",
            params![id],
        )?,
        ScopeGuard::Scoped(scope) => conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND scope_id = ?2",
            params![id, scope],
        )?,
    };
    Ok(rows > 0)
}

/// Scoped lookup by idempotency key: `scope_id = Some(s)` matches rows in that
/// scope, `None` matches unscoped rows.
pub fn find_by_idempotency_key(
    conn: &Connection,
    key: &str,
    scope_id: Option<&str>,
    dimensions: usize,
) -> Result<Option<Memory>> {
    let cols = memory_columns("");
    let memory = match scope_id {
        Some(scope) => conn
            .query_row(
                &format!(
                    "SELECT {cols} FROM memories WHERE idempotency_key = ?1 AND scope_id = ?2"
                ),
                params![key, scope],
                |row| memory_from_row(row, dimensions),
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT {cols} FROM memories WHERE idempotency_key = ?1 AND scope_id IS NULL"
                ),
                params![key],
                |row| memory_from_row(row, dimensions),
            )
            .optional()?,
    };
    Ok(memory)
}

/// FTS5 keyword search returning `(memory, rank)` pairs ordered best-first
/// (FTS ranks are negative; lower is better). An empty or whitespace-only
/// query returns recent memories by `strength DESC, last_accessed DESC` as a
/// synthetic result with rank 0.
pub fn search_fts(
    conn: &Connection,
    query: &str,
    limit: usize,
    filter: &ScopeFilter,
    dimensions: usize,
) -> Result<Vec<(Memory, f64)>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return recent_memories(conn, limit, filter, dimensions);
    }

    let (clauses, scope_values) = scope_clauses(filter, "m.");
    let scope_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" AND {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {}, memories_fts.rank FROM memories_fts \
         JOIN memories m ON m.id = memories_fts.id \
         WHERE memories_fts MATCH ?{scope_sql} ORDER BY memories_fts.rank LIMIT ?",
        memory_columns("m.")
    );

    let limit = limit as i64;
    let mut sql_params: Vec<&dyn ToSql> = vec![&escaped];
    sql_params.extend(scope_values);
    sql_params.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let results = stmt
        .query_map(sql_params.as_slice(), |row| {
            Ok((memory_from_row(row, dimensions)?, row.get::<_, f64>(15)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(results)
}

fn recent_memories(
    conn: &Connection,
    limit: usize,
    filter: &ScopeFilter,
    dimensions: usize,
) -> Result<Vec<(Memory, f64)>> {
    let (clauses, scope_values) = scope_clauses(filter, "");
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM memories{where_sql} ORDER BY strength DESC, last_accessed DESC LIMIT ?",
        memory_columns("")
    );

    let limit = limit as i64;
    let mut sql_params: Vec<&dyn ToSql> = Vec::new();
    sql_params.extend(scope_values);
    sql_params.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let results = stmt
        .query_map(sql_params.as_slice(), |row| {
            Ok((memory_from_row(row, dimensions)?, 0.0))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Fetch rows with a usable embedding, honoring scope filters. Rows whose
/// stored vector has a stale dimension are skipped.
pub fn get_with_embeddings(
    conn: &Connection,
    filter: &ScopeFilter,
    dimensions: usize,
) -> Result<Vec<Memory>> {
    let (clauses, scope_values) = scope_clauses(filter, "");
    let scope_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" AND {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM memories WHERE embedding IS NOT NULL{scope_sql}",
        memory_columns("")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(scope_values.as_slice(), |row| {
            memory_from_row(row, dimensions)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().filter(|m| m.embedding.is_some()).collect())
}

/// Record a recall hit: `last_accessed = now`, `strength = boost`,
/// `access_count += 1`. This is the only write path a read may take.
pub fn update_access(conn: &Connection, id: &str, boost_strength: f64) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE memories SET last_accessed = ?1, strength = ?2, \
         access_count = access_count + 1 WHERE id = ?3",
        params![now, boost_strength, id],
    )?;
    Ok(())
}

/// All rows, for the decay maintenance pass.
pub fn get_for_decay(conn: &Connection, dimensions: usize) -> Result<Vec<Memory>> {
    let sql = format!("SELECT {} FROM memories", memory_columns(""));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| memory_from_row(row, dimensions))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rows whose stored strength is below the threshold.
pub fn get_below_strength(
    conn: &Connection,
    threshold: f64,
    dimensions: usize,
) -> Result<Vec<Memory>> {
    let sql = format!(
        "SELECT {} FROM memories WHERE strength < ?1",
        memory_columns("")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![threshold], |row| memory_from_row(row, dimensions))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete rows whose stored strength is below the threshold. FTS rows are
/// removed by the delete trigger. Returns the number of rows removed.
pub fn prune_below_strength(conn: &Connection, threshold: f64) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM memories WHERE strength < ?1",
        params![threshold],
    )?;
    Ok(rows)
}

/// Persist a decayed strength without touching access bookkeeping. Used only
/// by the `decay --apply` maintenance path.
pub fn set_strength(conn: &Connection, id: &str, strength: f64) -> Result<()> {
    conn.execute(
        "UPDATE memories SET strength = ?1 WHERE id = ?2",
        params![strength.clamp(0.0, 1.0), id],
    )?;
    Ok(())
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes and joins with spaces
/// so FTS5 treats them as individual terms (implicit AND). Strips empty tokens.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
