//! Idempotency ledger — cached results keyed by `(key, operation, scope)`.
//!
//! The scope discriminator is the literal scope id when provided, else the
//! `__global__` sentinel. Rows are written last in the write pipeline and are
//! idempotent, so a crash between the memory write and the ledger save leaves
//! the store consistent (a replay re-creates an identical row).

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::migrations::GLOBAL_SCOPE_KEY;
use crate::error::{EngramError, Result};

fn scope_key(scope_id: Option<&str>) -> &str {
    scope_id.unwrap_or(GLOBAL_SCOPE_KEY)
}

/// Cache a result payload for `(key, operation, scope)`.
pub fn save(
    conn: &Connection,
    key: &str,
    operation: &str,
    scope_id: Option<&str>,
    result: &impl Serialize,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let payload = serde_json::to_string(result)?;
    conn.execute(
        "INSERT OR REPLACE INTO idempotency_ledger (key, operation, scope_key, result, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![key, operation, scope_key(scope_id), payload, now],
    )?;
    Ok(())
}

/// Look up a cached result. A row that fails to parse surfaces as
/// [`EngramError::CorruptLedger`] — callers log it and treat the key as
/// having no cached result.
pub fn get<T: DeserializeOwned>(
    conn: &Connection,
    key: &str,
    operation: &str,
    scope_id: Option<&str>,
) -> Result<Option<T>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT result FROM idempotency_ledger \
             WHERE key = ?1 AND operation = ?2 AND scope_key = ?3",
            params![key, operation, scope_key(scope_id)],
            |row| row.get(0),
        )
        .optional()?;

    match payload {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| EngramError::CorruptLedger {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}
