//! Scoped memory deletion.
//!
//! With scopes disabled, `forget` deletes by id alone. With scopes enabled, a
//! provided `scope_id` must match the memory's scope, and an omitted one
//! matches unscoped rows only — absence never bulk-deletes scoped rows.

use rusqlite::Connection;
use serde::Serialize;

use crate::config::FeatureConfig;
use crate::error::Result;
use crate::memory::metrics::{self, EventKind, MetricEvent};
use crate::memory::store;
use crate::memory::types::ScopeGuard;

#[derive(Debug, Serialize)]
pub struct ForgetResponse {
    pub id: String,
    pub deleted: bool,
}

pub fn forget(
    conn: &Connection,
    features: &FeatureConfig,
    id: &str,
    scope_id: Option<&str>,
    session_id: Option<&str>,
) -> Result<ForgetResponse> {
    let guard = if !features.scopes {
        ScopeGuard::Any
    } else {
        match scope_id {
            Some(scope) => ScopeGuard::Scoped(scope.to_string()),
            None => ScopeGuard::Unscoped,
        }
    };

    let deleted = store::delete_memory(conn, id, &guard)?;

    // Logged regardless of outcome.
    metrics::log_metric(
        conn,
        EventKind::Forget,
        &MetricEvent {
            session_id,
            memory_id: Some(id),
            ..Default::default()
        },
    )?;

    tracing::info!(id, deleted, "forget");
    Ok(ForgetResponse {
        id: id.to_string(),
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::{create_memory, NewMemory};

    fn features(scopes: bool) -> FeatureConfig {
        FeatureConfig {
            scopes,
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn flag_off_deletes_by_id_alone() {
        let conn = db::open_memory_database().unwrap();
        let m = create_memory(
            &conn,
            &NewMemory {
                content: "scoped row",
                scope_id: Some("a"),
                ..Default::default()
            },
        )
        .unwrap();

        // scope_id argument is ignored entirely when the flag is off
        let response = forget(&conn, &features(false), &m.id, Some("wrong"), None).unwrap();
        assert!(response.deleted);
    }

    #[test]
    fn flag_on_requires_matching_scope() {
        let conn = db::open_memory_database().unwrap();
        let m = create_memory(
            &conn,
            &NewMemory {
                content: "scoped row",
                scope_id: Some("a"),
                ..Default::default()
            },
        )
        .unwrap();

        // Omitted scope matches unscoped rows only
        let response = forget(&conn, &features(true), &m.id, None, None).unwrap();
        assert!(!response.deleted);

        let response = forget(&conn, &features(true), &m.id, Some("b"), None).unwrap();
        assert!(!response.deleted);

        let response = forget(&conn, &features(true), &m.id, Some("a"), None).unwrap();
        assert!(response.deleted);
    }

    #[test]
    fn missing_id_reports_not_deleted() {
        let conn = db::open_memory_database().unwrap();
        let response = forget(&conn, &features(true), "no-such-id", None, None).unwrap();
        assert!(!response.deleted);
    }

    #[test]
    fn metric_logged_even_when_nothing_deleted() {
        let conn = db::open_memory_database().unwrap();
        forget(&conn, &features(true), "no-such-id", None, Some("s1")).unwrap();

        let (event, session): (String, String) = conn
            .query_row(
                "SELECT event, session_id FROM metrics ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(event, "forget");
        assert_eq!(session, "s1");
    }
}
