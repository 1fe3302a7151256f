mod helpers;

use engram::memory::forget::forget;
use engram::memory::recall::{recall, RecallRequest};
use engram::memory::remember::{remember, RememberInput};
use engram::memory::store::get_memory_by_id;
use helpers::{test_config, test_db, TopicProvider, DIMS};

#[test]
fn scoped_forget_requires_matching_scope() {
    let conn = test_db();
    let config = test_config();

    let created = remember(
        &conn,
        Some(&TopicProvider),
        &config,
        &RememberInput {
            content: "Scoped".into(),
            scope_id: Some("A".into()),
            ..Default::default()
        },
    )
    .unwrap();

    // No scope given: only unscoped rows match, so nothing is deleted
    let response = forget(&conn, &config.features, &created.id, None, None).unwrap();
    assert!(!response.deleted);
    assert!(get_memory_by_id(&conn, &created.id, DIMS).unwrap().is_some());

    // Matching scope deletes
    let response = forget(&conn, &config.features, &created.id, Some("A"), None).unwrap();
    assert!(response.deleted);
    assert!(get_memory_by_id(&conn, &created.id, DIMS).unwrap().is_none());
}

#[test]
fn forgotten_memory_is_unfindable_by_any_search() {
    let conn = test_db();
    let config = test_config();

    let created = remember(
        &conn,
        Some(&TopicProvider),
        &config,
        &RememberInput {
            content: "TypeScript coding guidelines".into(),
            ..Default::default()
        },
    )
    .unwrap();

    let response = forget(&conn, &config.features, &created.id, None, None).unwrap();
    assert!(response.deleted);

    // Semantic path
    let semantic = recall(
        &conn,
        Some(&TopicProvider),
        &config,
        &RecallRequest::new("TypeScript coding"),
    )
    .unwrap();
    assert!(semantic.memories.iter().all(|m| m.id != created.id));

    // Keyword path
    let keyword = recall(&conn, None, &config, &RecallRequest::new("guidelines")).unwrap();
    assert!(keyword.memories.iter().all(|m| m.id != created.id));

    // FTS index row is gone, not just filtered
    let fts_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'guidelines'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(fts_rows, 0);
}

#[test]
fn forget_ignores_scope_when_flag_off() {
    let conn = test_db();
    let mut config = test_config();
    config.features.scopes = false;

    // Row created while scopes were on
    let mut flag_on = test_config();
    flag_on.features.scopes = true;
    let created = remember(
        &conn,
        None,
        &flag_on,
        &RememberInput {
            content: "Scoped row".into(),
            scope_id: Some("A".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let response = forget(&conn, &config.features, &created.id, None, None).unwrap();
    assert!(response.deleted);
}
