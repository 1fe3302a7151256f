mod helpers;

use chrono::{Duration, Utc};
use engram::memory::recall::{recall, RecallRequest};
use engram::memory::remember::{remember, RememberInput};
use engram::memory::store::get_memory_by_id;
use helpers::{test_config, test_db, TopicProvider, UnavailableProvider, DIMS};
use rusqlite::params;

fn store(conn: &rusqlite::Connection, content: &str) -> String {
    remember(
        conn,
        Some(&TopicProvider),
        &test_config(),
        &RememberInput {
            content: content.into(),
            ..Default::default()
        },
    )
    .unwrap()
    .id
}

#[test]
fn fallback_mode_on_empty_query() {
    let conn = test_db();
    let config = test_config();
    let first = store(&conn, "First memory");
    let second = store(&conn, "Second memory");

    let response = recall(
        &conn,
        Some(&TopicProvider),
        &config,
        &RecallRequest::new(""),
    )
    .unwrap();

    assert!(response.fallback_mode);
    assert_eq!(response.memories.len(), 2);

    // Both returned memories were boosted and counted
    for id in [&first, &second] {
        let row = get_memory_by_id(&conn, id, DIMS).unwrap().unwrap();
        assert!((row.strength - 1.0).abs() < f64::EPSILON);
        assert_eq!(row.access_count, 2);
    }
}

#[test]
fn semantic_ordering_ranks_related_content_first() {
    let conn = test_db();
    let config = test_config();
    let ts = store(&conn, "I love programming in TypeScript");
    store(&conn, "The weather today is sunny and warm");

    let response = recall(
        &conn,
        Some(&TopicProvider),
        &config,
        &RecallRequest::new("coding with JavaScript"),
    )
    .unwrap();

    assert!(!response.fallback_mode);
    assert_eq!(response.memories[0].id, ts);
    assert!(response.memories[0].relevance > response.memories[1].relevance);
}

#[test]
fn decay_is_ephemeral_across_repeated_recalls() {
    let conn = test_db();
    let config = test_config();
    let ts = store(&conn, "TypeScript programming language");
    let cake = store(&conn, "Chocolate cake recipe");

    // Backdate both as if untouched for a month
    let month_ago = (Utc::now() - Duration::days(30)).to_rfc3339();
    conn.execute(
        "UPDATE memories SET last_accessed = ?1",
        params![month_ago],
    )
    .unwrap();

    for _ in 0..3 {
        let mut request = RecallRequest::new("TypeScript");
        request.limit = 1;
        let response = recall(&conn, Some(&TopicProvider), &config, &request).unwrap();
        assert_eq!(response.memories[0].id, ts);
    }

    // The untouched memory was never compound-decayed by querying
    let cake_row = get_memory_by_id(&conn, &cake, DIMS).unwrap().unwrap();
    assert!((cake_row.strength - 1.0).abs() < f64::EPSILON);
    assert_eq!(cake_row.access_count, 1);

    // The returned memory ends boosted, with one access per recall
    let ts_row = get_memory_by_id(&conn, &ts, DIMS).unwrap().unwrap();
    assert!((ts_row.strength - 1.0).abs() < f64::EPSILON);
    assert_eq!(ts_row.access_count, 4);
}

#[test]
fn reads_leave_unreturned_memories_untouched() {
    let conn = test_db();
    let config = test_config();
    store(&conn, "TypeScript coding notes");
    let other = store(&conn, "Chocolate cake recipe");
    let before = get_memory_by_id(&conn, &other, DIMS).unwrap().unwrap();

    let mut request = RecallRequest::new("programming language code");
    request.limit = 1;
    for _ in 0..5 {
        recall(&conn, Some(&TopicProvider), &config, &request).unwrap();
    }

    let after = get_memory_by_id(&conn, &other, DIMS).unwrap().unwrap();
    assert_eq!(after.strength, before.strength);
    assert_eq!(after.access_count, before.access_count);
    assert_eq!(after.last_accessed, before.last_accessed);
}

#[test]
fn embedding_failure_degrades_to_keyword_search() {
    let conn = test_db();
    let config = test_config();
    // Stored with vectors, but the query-time embedder is broken
    store(&conn, "The deploy pipeline uses blue-green rollout");
    store(&conn, "Chocolate cake recipe");

    let response = recall(
        &conn,
        Some(&UnavailableProvider),
        &config,
        &RecallRequest::new("deploy rollout"),
    )
    .unwrap();

    assert!(!response.fallback_mode);
    assert_eq!(response.memories.len(), 1);
    assert!(response.memories[0].content.contains("deploy"));
}

#[test]
fn vectorless_store_is_still_searchable() {
    let conn = test_db();
    let config = test_config();
    // No provider at write time: the memory is stored without a vector
    remember(
        &conn,
        None,
        &config,
        &RememberInput {
            content: "Stored while the embedder was down".into(),
            ..Default::default()
        },
    )
    .unwrap();

    let response = recall(
        &conn,
        None,
        &config,
        &RecallRequest::new("embedder down"),
    )
    .unwrap();
    assert_eq!(response.memories.len(), 1);
}

#[test]
fn scope_isolation_holds_on_both_search_paths() {
    let conn = test_db();
    let config = test_config();
    for (scope, content) in [
        (Some("a"), "deploy checklist for scope a"),
        (Some("b"), "deploy checklist for scope b"),
        (None, "deploy checklist unscoped"),
    ] {
        remember(
            &conn,
            Some(&TopicProvider),
            &config,
            &RememberInput {
                content: content.into(),
                scope_id: scope.map(str::to_string),
                ..Default::default()
            },
        )
        .unwrap();
    }

    let mut request = RecallRequest::new("deploy checklist");
    request.scope.scope_id = Some("a".into());

    // Semantic path
    let semantic = recall(&conn, Some(&TopicProvider), &config, &request).unwrap();
    assert_eq!(semantic.memories.len(), 1);
    assert!(semantic.memories[0].content.ends_with("scope a"));

    // Keyword path (query embedding unavailable)
    let keyword = recall(&conn, Some(&UnavailableProvider), &config, &request).unwrap();
    assert_eq!(keyword.memories.len(), 1);
    assert!(keyword.memories[0].content.ends_with("scope a"));
}

#[test]
fn returned_strength_is_effective_not_stored() {
    let conn = test_db();
    let config = test_config();
    let id = store(&conn, "TypeScript programming notes");

    let month_ago = (Utc::now() - Duration::days(30)).to_rfc3339();
    conn.execute(
        "UPDATE memories SET last_accessed = ?1 WHERE id = ?2",
        params![month_ago, id],
    )
    .unwrap();

    let mut request = RecallRequest::new("TypeScript");
    request.min_strength = 0.0;
    let response = recall(&conn, Some(&TopicProvider), &config, &request).unwrap();

    let returned = &response.memories[0];
    let expected = 0.95f64.powf(30.0);
    assert!(
        (returned.strength - expected).abs() < 1e-2,
        "expected decayed strength near {expected}, got {}",
        returned.strength
    );
}
