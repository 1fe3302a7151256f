//! Write pipeline — create-or-upsert with idempotent replay.
//!
//! Three branches: upsert (replace an existing row found by idempotency key),
//! replay (return the ledger's cached result), and create. Embedding is
//! best-effort on every path: an unavailable embedder downgrades the write to
//! vectorless, it never fails it.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::EngramConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::memory::ledger;
use crate::memory::metrics::{self, EventKind, MetricEvent};
use crate::memory::store::{self, ContentUpdate, NewMemory};

/// The ledger operation name for remember writes.
const REMEMBER_OP: &str = "remember";

/// Inputs to a remember.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RememberInput {
    pub content: String,
    pub category: Option<String>,
    pub scope_id: Option<String>,
    pub chat_id: Option<String>,
    pub thread_id: Option<String>,
    pub task_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub upsert: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct RememberResponse {
    pub id: String,
    pub status: WriteStatus,
}

/// Shape of a cached ledger result.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    id: String,
    status: String,
}

pub fn remember(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    config: &EngramConfig,
    input: &RememberInput,
) -> Result<RememberResponse> {
    if input.content.trim().is_empty() {
        return Err(EngramError::invalid("content must not be empty"));
    }
    if input.upsert && input.idempotency_key.is_none() {
        return Err(EngramError::invalid("upsert requires idempotency_key"));
    }

    let scopes_enabled = config.features.scopes;
    let idempotency_enabled = config.features.idempotency;

    // Scope fields take effect only under the flag; otherwise they are
    // accepted and ignored (stored as null) to stay wire-compatible.
    let scope_id = scopes_enabled.then(|| input.scope_id.as_deref()).flatten();
    let chat_id = scopes_enabled.then(|| input.chat_id.as_deref()).flatten();
    let thread_id = scopes_enabled.then(|| input.thread_id.as_deref()).flatten();
    let task_id = scopes_enabled.then(|| input.task_id.as_deref()).flatten();

    // The ledger scope discriminator follows the same gating.
    let ledger_scope = scope_id;
    let key = input.idempotency_key.as_deref();

    // Branch A — upsert: full replace of an existing row found by key.
    if input.upsert {
        let key = key.expect("validated above");
        if let Some(existing) =
            store::find_by_idempotency_key(conn, key, ledger_scope, config.embedding.dimensions)?
        {
            let embedding = embed_best_effort(provider, &input.content);
            store::update_memory_content(
                conn,
                &existing.id,
                &ContentUpdate {
                    content: &input.content,
                    category: input.category.as_deref(),
                    metadata: input.metadata.as_ref(),
                    embedding: embedding.as_deref(),
                },
            )?;
            metrics::log_metric(
                conn,
                EventKind::Upsert,
                &MetricEvent {
                    session_id: input.session_id.as_deref(),
                    memory_id: Some(&existing.id),
                    ..Default::default()
                },
            )?;
            if idempotency_enabled {
                ledger::save(
                    conn,
                    key,
                    REMEMBER_OP,
                    ledger_scope,
                    &LedgerEntry {
                        id: existing.id.clone(),
                        status: "updated".into(),
                    },
                )?;
            }
            tracing::info!(id = %existing.id, "memory updated via upsert");
            return Ok(RememberResponse {
                id: existing.id,
                status: WriteStatus::Updated,
            });
        }
        // No existing row: fall through to create with the supplied key.
    } else if idempotency_enabled {
        // Branch B — replay: the ledger's historical record wins. A replayed
        // key always reports "created", even after later upserts.
        if let Some(key) = key {
            match ledger::get::<LedgerEntry>(conn, key, REMEMBER_OP, ledger_scope) {
                Ok(Some(prior)) => {
                    tracing::debug!(id = %prior.id, key, "remember replayed from ledger");
                    return Ok(RememberResponse {
                        id: prior.id,
                        status: WriteStatus::Created,
                    });
                }
                Ok(None) => {}
                Err(err @ EngramError::CorruptLedger { .. }) => {
                    tracing::warn!(error = %err, "ignoring corrupt ledger entry");
                }
                Err(other) => return Err(other),
            }
        }
    }

    // Branch C — create.
    let embedding = embed_best_effort(provider, &input.content);
    // The key is stored on the row when the flag is on, or when this create
    // came from an upsert — so later upserts can find it even flag-off.
    let stored_key = if idempotency_enabled || input.upsert {
        key
    } else {
        None
    };

    let created = store::create_memory(
        conn,
        &NewMemory {
            content: &input.content,
            category: input.category.as_deref(),
            scope_id,
            chat_id,
            thread_id,
            task_id,
            metadata: input.metadata.as_ref(),
            idempotency_key: stored_key,
            embedding: embedding.as_deref(),
        },
    )?;

    metrics::log_metric(
        conn,
        EventKind::Remember,
        &MetricEvent {
            session_id: input.session_id.as_deref(),
            memory_id: Some(&created.id),
            ..Default::default()
        },
    )?;

    if idempotency_enabled {
        if let Some(key) = key {
            ledger::save(
                conn,
                key,
                REMEMBER_OP,
                ledger_scope,
                &LedgerEntry {
                    id: created.id.clone(),
                    status: "created".into(),
                },
            )?;
        }
    }

    tracing::info!(id = %created.id, has_embedding = embedding.is_some(), "memory created");
    Ok(RememberResponse {
        id: created.id,
        status: WriteStatus::Created,
    })
}

/// Embed content, downgrading failures to a vectorless write.
fn embed_best_effort(provider: Option<&dyn EmbeddingProvider>, text: &str) -> Option<Vec<f32>> {
    match provider {
        Some(p) => match p.embed(text) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed, storing without vector");
                None
            }
        },
        None => None,
    }
}
