mod helpers;

use engram::memory::forget::forget;
use engram::memory::metrics::metrics_summary;
use engram::memory::recall::{recall, RecallRequest};
use engram::memory::remember::{remember, RememberInput};
use helpers::{test_config, test_db, TopicProvider};

#[test]
fn pipeline_events_land_in_summary() {
    let conn = test_db();
    let config = test_config();

    let created = remember(
        &conn,
        Some(&TopicProvider),
        &config,
        &RememberInput {
            content: "TypeScript release checklist".into(),
            session_id: Some("s1".into()),
            ..Default::default()
        },
    )
    .unwrap();

    // One hit, one miss, one fallback (empty query over a non-empty store
    // still counts as fallback mode)
    let mut hit = RecallRequest::new("TypeScript checklist");
    hit.session_id = Some("s1".into());
    recall(&conn, Some(&TopicProvider), &config, &hit).unwrap();

    let mut miss = RecallRequest::new("totally unrelated basketweaving");
    miss.session_id = Some("s1".into());
    let miss_response = recall(&conn, None, &config, &miss).unwrap();
    assert!(miss_response.memories.is_empty());

    let mut recent = RecallRequest::new("");
    recent.session_id = Some("s1".into());
    recall(&conn, None, &config, &recent).unwrap();

    forget(&conn, &config.features, &created.id, None, Some("s1")).unwrap();

    let summary = metrics_summary(&conn, Some("s1")).unwrap();
    assert_eq!(summary.total_remembers, 1);
    assert_eq!(summary.total_recalls, 3);
    assert!((summary.recall_hit_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((summary.fallback_rate - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn sessions_do_not_leak_into_each_other() {
    let conn = test_db();
    let config = test_config();

    let mut s1 = RecallRequest::new("");
    s1.session_id = Some("s1".into());
    recall(&conn, None, &config, &s1).unwrap();

    let mut s2 = RecallRequest::new("");
    s2.session_id = Some("s2".into());
    recall(&conn, None, &config, &s2).unwrap();
    recall(&conn, None, &config, &s2).unwrap();

    assert_eq!(metrics_summary(&conn, Some("s1")).unwrap().total_recalls, 1);
    assert_eq!(metrics_summary(&conn, Some("s2")).unwrap().total_recalls, 2);
    assert_eq!(metrics_summary(&conn, None).unwrap().total_recalls, 3);
}
