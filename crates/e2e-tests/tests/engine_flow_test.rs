//! End-to-end engine flow tests.
//!
//! Walks the store -> recall -> forget path with the policy attached,
//! plus cluster binding, working memory, and health reporting.

use chrono::Utc;
use pretty_assertions::assert_eq;

use e2e_tests::TestHarness;
use mnemon_engine::{ForgetFilter, RecallRequest, StoreRequest};
use mnemon_policy::OperatingMode;
use mnemon_types::{MemoryKind, MemorySource, MemoryStatus};

#[test]
fn test_store_recall_forget_round_trip() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    // 1. Store a user preference.
    let stored = engine
        .store(
            StoreRequest::new("User prefers dark mode in the editor", MemoryKind::Semantic)
                .with_tags(vec!["preference".to_string(), "ui".to_string()])
                .with_source(MemorySource::User),
        )
        .unwrap();

    assert_eq!(stored.id, 1);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.status, MemoryStatus::Active);
    // Semantic baseline 0.6 plus the user-source modifier.
    assert!((stored.salience - 0.65).abs() < 1e-9);
    assert_eq!(stored.trace["policy_mode"], "normal");

    // 2. Recall by tag; the hit is touched and persisted.
    let hits = engine
        .recall(&RecallRequest::new().with_tag("preference"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload, "User prefers dark mode in the editor");
    assert_eq!(hits[0].version, 2);
    assert!(hits[0].last_used_at.is_some());

    // 3. Forget by the other tag.
    let removed = engine
        .forget(&ForgetFilter::by_tags(vec!["ui".to_string()]))
        .unwrap();
    assert_eq!(removed, 1);

    let hits = engine
        .recall(&RecallRequest::new().with_tag("preference"))
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(engine.get_health().total, 0);
}

#[test]
fn test_untagged_store_gets_fallback_and_month_tags() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);

    let stored = harness
        .engine
        .store(StoreRequest::new("a bare note", MemoryKind::Semantic))
        .unwrap();

    let month = Utc::now().format("%Y-%m").to_string();
    assert_eq!(stored.tags, vec!["general".to_string(), month]);
}

#[test]
fn test_recall_without_touch_leaves_item_untouched() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    harness
        .engine
        .store(StoreRequest::new("read-only inspection", MemoryKind::Semantic))
        .unwrap();

    let hits = harness
        .engine
        .recall(&RecallRequest::new().without_touch())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].version, 1);
    assert!(hits[0].last_used_at.is_none());

    // Nothing was persisted either.
    let item = harness.engine.trace(1).unwrap();
    assert_eq!(item.version, 1);
}

#[test]
fn test_recall_filters_intersect() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    engine
        .store(
            StoreRequest::new("semantic shared", MemoryKind::Semantic)
                .with_tag("shared"),
        )
        .unwrap();
    engine
        .store(
            StoreRequest::new("procedural shared", MemoryKind::Procedural)
                .with_tag("shared"),
        )
        .unwrap();
    engine
        .store(
            StoreRequest::new("semantic other", MemoryKind::Semantic)
                .with_tag("other"),
        )
        .unwrap();

    let hits = engine
        .recall(
            &RecallRequest::new()
                .with_kind(MemoryKind::Semantic)
                .with_tag("shared"),
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload, "semantic shared");
}

#[test]
fn test_recall_orders_by_salience_and_limits() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    // User-source modifier adds 0.05 to each requested salience.
    for (payload, salience) in [("low", 0.30), ("high", 0.90), ("mid", 0.50)] {
        engine
            .store(
                StoreRequest::new(payload, MemoryKind::Semantic)
                    .with_tag("ranked")
                    .with_salience(salience),
            )
            .unwrap();
    }

    let hits = engine
        .recall(&RecallRequest::new().with_tag("ranked").with_limit(2))
        .unwrap();
    let payloads: Vec<&str> = hits.iter().map(|item| item.payload.as_str()).collect();
    assert_eq!(payloads, vec!["high", "mid"]);
}

#[test]
fn test_bind_cluster_links_items() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    for payload in ["likes espresso", "dislikes instant coffee", "unrelated"] {
        engine
            .store(StoreRequest::new(payload, MemoryKind::Semantic))
            .unwrap();
    }

    let cluster = engine.bind_cluster(&[1, 2]).unwrap();
    assert_eq!(cluster, 1);
    assert_eq!(engine.trace(1).unwrap().cluster_id, Some(1));
    assert_eq!(engine.trace(2).unwrap().cluster_id, Some(1));
    assert_eq!(engine.trace(3).unwrap().cluster_id, None);

    // A second binding gets a fresh cluster id.
    let next = engine.bind_cluster(&[3]).unwrap();
    assert_eq!(next, 2);
}

#[test]
fn test_working_memory_follows_session() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    for i in 0..3 {
        engine
            .store(
                StoreRequest::new(format!("turn {i}"), MemoryKind::Episodic)
                    .with_session("session-a"),
            )
            .unwrap();
    }

    let recent = engine.working_memory("session-a", 10);
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].payload, "turn 0");
    assert_eq!(engine.working_memory("session-b", 10).len(), 0);

    // Clearing the session leaves long-term memory intact.
    assert_eq!(engine.clear_working_memory("session-a"), 3);
    assert_eq!(engine.get_health().total, 3);
}

#[test]
fn test_health_counts_by_kind_and_status() {
    let harness = TestHarness::with_policy(OperatingMode::Normal);
    let engine = &harness.engine;

    engine
        .store(StoreRequest::new("fact one", MemoryKind::Semantic).with_tag("facts"))
        .unwrap();
    engine
        .store(StoreRequest::new("fact two", MemoryKind::Semantic).with_tag("facts"))
        .unwrap();
    engine
        .store(StoreRequest::new("how to deploy", MemoryKind::Procedural))
        .unwrap();
    engine
        .store(StoreRequest::new("met Sam today", MemoryKind::Episodic))
        .unwrap();

    engine.update_status(4, MemoryStatus::Stale).unwrap();

    let health = engine.get_health();
    assert_eq!(health.total, 4);
    assert_eq!(health.semantic_entries, 2);
    assert_eq!(health.procedural_entries, 1);
    assert_eq!(health.episodic_entries, 1);
    assert_eq!(health.active, 3);
    assert_eq!(health.stale, 1);
    assert_eq!(health.archived, 0);
    assert_eq!(health.working_sessions, 0);
}
