//! Retrieval pipeline.
//!
//! Pipeline order: recent-mode for empty queries, semantic cosine ranking when
//! embeddings are available, FTS keyword fallback otherwise. Effective
//! strength is computed per candidate at query time; only memories actually
//! returned get their access recorded.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::EngramConfig;
use crate::embedding::{cosine, EmbeddingProvider};
use crate::error::{EngramError, Result};
use crate::memory::decay::effective_strength;
use crate::memory::metrics::{self, EventKind, MetricEvent};
use crate::memory::store;
use crate::memory::types::{Memory, ScopeFilter};

/// Inputs to a recall.
#[derive(Debug, Clone, Deserialize)]
pub struct RecallRequest {
    pub query: String,
    pub limit: usize,
    pub category: Option<String>,
    pub min_strength: f64,
    pub session_id: Option<String>,
    pub scope: ScopeFilter,
}

impl RecallRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            category: None,
            min_strength: 0.1,
            session_id: None,
            scope: ScopeFilter::default(),
        }
    }
}

/// One ranked result. `strength` is the effective strength computed at query
/// time, not the stored base.
#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub strength: f64,
    pub relevance: f64,
    pub created_at: String,
    pub access_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub memories: Vec<RecalledMemory>,
    pub fallback_mode: bool,
}

/// Candidate carrying its relevance and effective strength through ranking.
struct Candidate {
    memory: Memory,
    relevance: f64,
    effective: f64,
}

pub fn recall(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    config: &EngramConfig,
    request: &RecallRequest,
) -> Result<RecallResponse> {
    let query = request.query.trim();
    let now = Utc::now();

    let (mut candidates, fallback_mode) = if query.is_empty() {
        (recent_mode(conn, config, request, now)?, true)
    } else {
        match semantic_mode(conn, provider, config, request, query, now)? {
            Some(ranked) => (ranked, false),
            None => (fts_mode(conn, config, request, query, now)?, false),
        }
    };

    candidates.truncate(request.limit);

    // Access updates apply only to memories actually returned.
    for candidate in &candidates {
        store::update_access(
            conn,
            &candidate.memory.id,
            config.decay.access_boost_strength,
        )?;
    }

    metrics::log_metric(
        conn,
        EventKind::Recall,
        &MetricEvent {
            session_id: request.session_id.as_deref(),
            query: Some(&request.query),
            result_count: Some(candidates.len()),
            was_fallback: Some(fallback_mode),
            ..Default::default()
        },
    )?;

    Ok(RecallResponse {
        memories: candidates
            .into_iter()
            .map(|c| RecalledMemory {
                id: c.memory.id,
                content: c.memory.content,
                category: c.memory.category,
                strength: c.effective,
                relevance: c.relevance,
                created_at: c.memory.created_at,
                access_count: c.memory.access_count,
            })
            .collect(),
        fallback_mode,
    })
}

/// Empty query: recent memories ranked by effective strength then recency.
fn recent_mode(
    conn: &Connection,
    config: &EngramConfig,
    request: &RecallRequest,
    now: DateTime<Utc>,
) -> Result<Vec<Candidate>> {
    let rows = store::search_fts(
        conn,
        "",
        request.limit * 2,
        &request.scope,
        config.embedding.dimensions,
    )?;
    let mut candidates: Vec<Candidate> = rows
        .into_iter()
        .filter_map(|(memory, _)| {
            let effective = effective_for(&memory, now, config);
            passes_filters(&memory, effective, request).then_some(Candidate {
                relevance: effective,
                effective,
                memory,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.effective
            .partial_cmp(&a.effective)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(&a.memory, &b.memory))
    });
    Ok(candidates)
}

/// Semantic mode: cosine ranking over candidates with embeddings. Returns
/// `None` when there are no candidates or the query embedding fails, so the
/// caller falls through to FTS.
fn semantic_mode(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    config: &EngramConfig,
    request: &RecallRequest,
    query: &str,
    now: DateTime<Utc>,
) -> Result<Option<Vec<Candidate>>> {
    let rows = store::get_with_embeddings(conn, &request.scope, config.embedding.dimensions)?;
    if rows.is_empty() {
        return Ok(None);
    }

    let embed_result = match provider {
        Some(p) => p.embed(query),
        None => Err(EngramError::EmbeddingUnavailable(
            "no embedding provider".into(),
        )),
    };
    let query_vec = match embed_result {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "query embedding failed, falling back to FTS");
            return Ok(None);
        }
    };

    let mut candidates: Vec<Candidate> = rows
        .into_iter()
        .filter_map(|memory| {
            let vector = memory.embedding.as_deref()?;
            let similarity = cosine(&query_vec, vector) as f64;
            let effective = effective_for(&memory, now, config);
            passes_filters(&memory, effective, request).then_some(Candidate {
                relevance: similarity,
                effective,
                memory,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(&a.memory, &b.memory))
    });
    Ok(Some(candidates))
}

/// FTS keyword fallback. Lower (more negative) rank is a better match;
/// `relevance = exp(rank)` maps ranks into (0, 1].
fn fts_mode(
    conn: &Connection,
    config: &EngramConfig,
    request: &RecallRequest,
    query: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Candidate>> {
    let rows = store::search_fts(
        conn,
        query,
        request.limit * 2,
        &request.scope,
        config.embedding.dimensions,
    )?;
    let mut scored: Vec<(Candidate, f64)> = rows
        .into_iter()
        .filter_map(|(memory, rank)| {
            let effective = effective_for(&memory, now, config);
            passes_filters(&memory, effective, request).then_some((
                Candidate {
                    relevance: rank.exp(),
                    effective,
                    memory,
                },
                rank,
            ))
        })
        .collect();

    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(&a.0.memory, &b.0.memory))
    });
    Ok(scored.into_iter().map(|(c, _)| c).collect())
}

fn effective_for(memory: &Memory, now: DateTime<Utc>, config: &EngramConfig) -> f64 {
    effective_strength(
        memory.strength,
        &memory.last_accessed,
        memory.access_count,
        now,
        config.decay.decay_rate,
    )
}

fn passes_filters(memory: &Memory, effective: f64, request: &RecallRequest) -> bool {
    if effective < request.min_strength {
        return false;
    }
    if let Some(category) = &request.category {
        if memory.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    true
}

fn tie_break(a: &Memory, b: &Memory) -> Ordering {
    b.last_accessed
        .cmp(&a.last_accessed)
        .then_with(|| a.id.cmp(&b.id))
}
