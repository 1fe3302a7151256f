//! Time-decay relevance model.
//!
//! Effective strength is computed on read and never written back by queries —
//! repeated recalls that do not return a memory must not compound-decay it.
//! The only paths that persist strength are [`crate::memory::store::update_access`]
//! (recall hits) and [`apply_decay`] (the explicit maintenance pass).

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::memory::store;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Compute the decay-adjusted, access-boosted strength.
///
/// ```text
/// days_since = (now − last_accessed) / 86400
/// decay_factor = decay_rate ^ days_since
/// access_boost = log(access_count + 1) / log(2)
/// effective = clamp(base * decay_factor * access_boost, 0, 1)
/// ```
///
/// Just-accessed memories (`days_since < 0.001`, which also covers clock skew)
/// return `min(base, 1.0)` without further scaling. An unparseable
/// `last_accessed` is treated as just-accessed.
pub fn effective_strength(
    base_strength: f64,
    last_accessed: &str,
    access_count: i64,
    now: DateTime<Utc>,
    decay_rate: f64,
) -> f64 {
    let last = match DateTime::parse_from_rfc3339(last_accessed) {
        Ok(t) => t.with_timezone(&Utc),
        Err(_) => now,
    };
    let days_since = (now - last).num_milliseconds() as f64 / (SECONDS_PER_DAY * 1000.0);

    if days_since < 0.001 {
        return base_strength.min(1.0);
    }

    let decay_factor = decay_rate.powf(days_since);
    let access_boost = ((access_count as f64) + 1.0).ln() / 2.0f64.ln();
    (base_strength * decay_factor * access_boost).clamp(0.0, 1.0)
}

/// One row of a decay preview.
#[derive(Debug, Serialize)]
pub struct DecayPreview {
    pub id: String,
    pub stored_strength: f64,
    pub effective_strength: f64,
}

/// Report from a persisted decay pass.
#[derive(Debug, Serialize)]
pub struct DecayReport {
    pub scanned: usize,
    pub updated: usize,
}

/// Report from a prune pass.
#[derive(Debug, Serialize)]
pub struct PruneReport {
    pub removed: usize,
}

/// Compute decayed strengths for every memory without writing anything.
pub fn preview_decay(
    conn: &Connection,
    decay_rate: f64,
    dimensions: usize,
) -> Result<Vec<DecayPreview>> {
    let now = Utc::now();
    let rows = store::get_for_decay(conn, dimensions)?;
    Ok(rows
        .into_iter()
        .map(|m| DecayPreview {
            effective_strength: effective_strength(
                m.strength,
                &m.last_accessed,
                m.access_count,
                now,
                decay_rate,
            ),
            stored_strength: m.strength,
            id: m.id,
        })
        .collect())
}

/// Persist decayed strengths (`decay --apply`). Access bookkeeping
/// (`last_accessed`, `access_count`) is untouched.
pub fn apply_decay(conn: &Connection, decay_rate: f64, dimensions: usize) -> Result<DecayReport> {
    let previews = preview_decay(conn, decay_rate, dimensions)?;
    let scanned = previews.len();
    let mut updated = 0;
    for preview in previews {
        if (preview.effective_strength - preview.stored_strength).abs() > 1e-9 {
            store::set_strength(conn, &preview.id, preview.effective_strength)?;
            updated += 1;
        }
    }
    tracing::info!(scanned, updated, "decay applied");
    Ok(DecayReport { scanned, updated })
}

/// Destroy memories whose stored strength is below the threshold. Run after
/// `decay --apply` so the stored values reflect decay.
pub fn prune(conn: &Connection, threshold: f64) -> Result<PruneReport> {
    let removed = store::prune_below_strength(conn, threshold)?;
    tracing::info!(removed, threshold, "pruned weak memories");
    Ok(PruneReport { removed })
}
