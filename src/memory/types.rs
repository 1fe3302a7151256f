//! Core memory type definitions.
//!
//! [`Memory`] mirrors the `memories` table. [`ScopeFilter`] carries the four
//! optional isolation dimensions that AND-compose onto queries, and
//! [`ScopeGuard`] expresses how a delete matches against `scope_id`.

use serde::{Deserialize, Serialize};

/// Well-known category hints. Categories are a free-form filter, not a
/// taxonomy — any string is accepted and stored as-is.
pub const CATEGORY_HINTS: [&str; 5] = ["decision", "pattern", "fact", "preference", "insight"];

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key. Opaque to callers.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// Optional category hint (see [`CATEGORY_HINTS`]).
    pub category: Option<String>,
    /// Isolation dimensions; `None` means unscoped.
    pub scope_id: Option<String>,
    pub chat_id: Option<String>,
    pub thread_id: Option<String>,
    pub task_id: Option<String>,
    /// Arbitrary JSON metadata, interpreted by callers.
    pub metadata: Option<serde_json::Value>,
    /// Caller-chosen stable identity for retry/update.
    pub idempotency_key: Option<String>,
    /// ISO 8601 creation timestamp. Never mutates.
    pub created_at: String,
    /// ISO 8601 last content-update timestamp.
    pub updated_at: String,
    /// ISO 8601 timestamp of the last recall hit.
    pub last_accessed: String,
    /// Number of times this memory has been returned by a recall. Starts at 1.
    pub access_count: i64,
    /// Persisted base strength in `[0.0, 1.0]`. Effective strength is
    /// computed at query time by the decay engine.
    pub strength: f64,
    /// Unit-normalized embedding, absent when the embedder was unavailable
    /// at write time (or the stored vector has a stale dimension).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Optional isolation constraints for queries. Absent fields are not filtered;
/// present fields AND-compose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub scope_id: Option<String>,
    pub chat_id: Option<String>,
    pub thread_id: Option<String>,
    pub task_id: Option<String>,
}

impl ScopeFilter {
    pub fn is_empty(&self) -> bool {
        self.scope_id.is_none()
            && self.chat_id.is_none()
            && self.thread_id.is_none()
            && self.task_id.is_none()
    }
}

/// How a delete matches against a memory's `scope_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeGuard {
    /// Match by id alone.
    Any,
    /// Match only if the memory is unscoped (`scope_id IS NULL`).
    Unscoped,
    /// Match only if the memory's `scope_id` equals the given value.
    Scoped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_filter() {
        assert!(ScopeFilter::default().is_empty());
        let filter = ScopeFilter {
            scope_id: Some("a".into()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }

    #[test]
    fn memory_serializes_without_absent_embedding() {
        let memory = Memory {
            id: "m1".into(),
            content: "hello".into(),
            category: None,
            scope_id: None,
            chat_id: None,
            thread_id: None,
            task_id: None,
            metadata: None,
            idempotency_key: None,
            created_at: "2026-01-01T00:00:00+00:00".into(),
            updated_at: "2026-01-01T00:00:00+00:00".into(),
            last_accessed: "2026-01-01T00:00:00+00:00".into(),
            access_count: 1,
            strength: 1.0,
            embedding: None,
        };
        let json = serde_json::to_value(&memory).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["access_count"], 1);
    }
}
