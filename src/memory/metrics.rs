//! Append-only metrics ledger for per-session observability.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;

/// The event kinds the metrics ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Remember,
    Recall,
    Forget,
    Upsert,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remember => "remember",
            Self::Recall => "recall",
            Self::Forget => "forget",
            Self::Upsert => "upsert",
        }
    }
}

/// One metric event. All fields other than the kind are optional.
#[derive(Debug, Default)]
pub struct MetricEvent<'a> {
    pub session_id: Option<&'a str>,
    pub memory_id: Option<&'a str>,
    pub query: Option<&'a str>,
    pub result_count: Option<usize>,
    pub was_fallback: Option<bool>,
}

/// Append a metric event.
pub fn log_metric(conn: &Connection, kind: EventKind, event: &MetricEvent<'_>) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO metrics (ts, session_id, event, memory_id, query, result_count, was_fallback) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            now,
            event.session_id,
            kind.as_str(),
            event.memory_id,
            event.query,
            event.result_count.map(|c| c as i64),
            event.was_fallback.map(i64::from),
        ],
    )?;
    Ok(())
}

/// Aggregated view over the metrics ledger.
#[derive(Debug, Serialize)]
pub struct MetricsSummary {
    pub total_remembers: u64,
    pub total_recalls: u64,
    /// Share of recall events that returned at least one result.
    pub recall_hit_rate: f64,
    /// Share of recall events served in fallback mode.
    pub fallback_rate: f64,
}

/// Summarize metrics, optionally restricted to one session. Zero denominators
/// produce 0 rates.
pub fn metrics_summary(conn: &Connection, session: Option<&str>) -> Result<MetricsSummary> {
    let (session_sql, has_session) = match session {
        Some(_) => (" AND session_id = ?1", true),
        None => ("", false),
    };

    let count = |event: &str, extra: &str| -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM metrics WHERE event = '{event}'{extra}{session_sql}"
        );
        let n: i64 = if has_session {
            conn.query_row(&sql, params![session.unwrap()], |row| row.get(0))?
        } else {
            conn.query_row(&sql, [], |row| row.get(0))?
        };
        Ok(n as u64)
    };

    let total_remembers = count("remember", "")?;
    let total_recalls = count("recall", "")?;
    let recall_hits = count("recall", " AND result_count > 0")?;
    let fallbacks = count("recall", " AND was_fallback = 1")?;

    let rate = |numerator: u64| {
        if total_recalls == 0 {
            0.0
        } else {
            numerator as f64 / total_recalls as f64
        }
    };

    Ok(MetricsSummary {
        total_remembers,
        total_recalls,
        recall_hit_rate: rate(recall_hits),
        fallback_rate: rate(fallbacks),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn empty_ledger_summary_is_zero() {
        let conn = db::open_memory_database().unwrap();
        let summary = metrics_summary(&conn, None).unwrap();
        assert_eq!(summary.total_remembers, 0);
        assert_eq!(summary.total_recalls, 0);
        assert_eq!(summary.recall_hit_rate, 0.0);
        assert_eq!(summary.fallback_rate, 0.0);
    }

    #[test]
    fn rates_computed_over_recalls() {
        let conn = db::open_memory_database().unwrap();
        log_metric(&conn, EventKind::Remember, &MetricEvent::default()).unwrap();
        log_metric(
            &conn,
            EventKind::Recall,
            &MetricEvent {
                query: Some("rust"),
                result_count: Some(2),
                was_fallback: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        log_metric(
            &conn,
            EventKind::Recall,
            &MetricEvent {
                query: Some(""),
                result_count: Some(0),
                was_fallback: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let summary = metrics_summary(&conn, None).unwrap();
        assert_eq!(summary.total_remembers, 1);
        assert_eq!(summary.total_recalls, 2);
        assert!((summary.recall_hit_rate - 0.5).abs() < 1e-9);
        assert!((summary.fallback_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn session_filter_restricts_summary() {
        let conn = db::open_memory_database().unwrap();
        log_metric(
            &conn,
            EventKind::Recall,
            &MetricEvent {
                session_id: Some("s1"),
                result_count: Some(1),
                was_fallback: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        log_metric(
            &conn,
            EventKind::Recall,
            &MetricEvent {
                session_id: Some("s2"),
                result_count: Some(0),
                was_fallback: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let s1 = metrics_summary(&conn, Some("s1")).unwrap();
        assert_eq!(s1.total_recalls, 1);
        assert!((s1.recall_hit_rate - 1.0).abs() < 1e-9);
        assert_eq!(s1.fallback_rate, 0.0);
    }
}
