//! Lifecycle tests: decay over seeded history, drift flagging, the
//! reconfirmation path, and decay previews.

use pretty_assertions::assert_eq;

use e2e_tests::{backdated_item, TestHarness};
use mnemon_lifecycle::{DriftAction, MemoryLifecycle};
use mnemon_types::{MemoryKind, MemoryStatus};

#[test]
fn test_episodic_salience_halves_after_thirty_days() {
    let harness = TestHarness::seeded(vec![backdated_item(
        1,
        MemoryKind::Episodic,
        "team standup moved to 9am",
        0.8,
        30,
    )]);

    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let items = harness.engine.get_all_for_lifecycle();
    let report = lifecycle.process_memories(&items, true, true);

    assert_eq!(report.decay_updates.len(), 1);
    let update = &report.decay_updates[0];
    assert_eq!(update.id, 1);
    assert!((update.old_salience - 0.8).abs() < 1e-9);
    assert!((update.new_salience - 0.4).abs() < 0.001);
    assert_eq!(update.new_status, MemoryStatus::Active);

    // Half a half-life short of the general review window: no drift yet.
    assert!(report.drift_reports.is_empty());

    let applied = harness.engine.apply_decay_updates(&report.decay_updates).unwrap();
    assert_eq!(applied, 1);
    assert!((harness.engine.trace(1).unwrap().salience - 0.4).abs() < 0.001);
}

#[test]
fn test_very_old_item_archives_and_reports_drift() {
    let harness = TestHarness::seeded(vec![backdated_item(
        1,
        MemoryKind::Episodic,
        "lunch order from two quarters ago",
        0.8,
        200,
    )]);

    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let report = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);

    assert_eq!(report.decay_updates.len(), 1);
    let update = &report.decay_updates[0];
    // 200 days is deep past the floor for a 30-day half-life.
    assert!((update.new_salience - 0.01).abs() < 1e-9);
    assert_eq!(update.new_status, MemoryStatus::Archived);

    assert_eq!(report.drift_reports.len(), 1);
    assert_eq!(report.drift_reports[0].recommended_action, DriftAction::Archive);
    assert!(report.drift_reports[0].reason.contains("Very low salience"));

    harness.engine.apply_decay_updates(&report.decay_updates).unwrap();
    let item = harness.engine.trace(1).unwrap();
    assert_eq!(item.status, MemoryStatus::Archived);

    // An archived item is left alone by the next pass.
    let second = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);
    assert_eq!(second.summary.processed, 1);
    assert_eq!(second.summary.decay_changes, 0);
    assert!(second.drift_reports.is_empty());
}

#[test]
fn test_reconfirm_restores_archived_item() {
    let harness = TestHarness::seeded(vec![backdated_item(
        1,
        MemoryKind::Semantic,
        "prefers tabs over spaces",
        0.5,
        400,
    )]);

    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let report = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);
    harness.engine.apply_decay_updates(&report.decay_updates).unwrap();
    assert_eq!(
        harness.engine.trace(1).unwrap().status,
        MemoryStatus::Archived
    );

    assert!(harness.engine.reconfirm_memory(1, None).unwrap());

    let item = harness.engine.trace(1).unwrap();
    assert_eq!(item.status, MemoryStatus::Active);
    assert!((item.salience - 0.5).abs() < 1e-9);
    assert!(item.last_used_at.is_some());
    assert!(item.version > 1);
}

#[test]
fn test_identity_items_flag_sooner_than_general() {
    let mut identity = backdated_item(1, MemoryKind::Semantic, "goes by Kestrel", 0.9, 45);
    identity.tags = vec!["identity".to_string()];
    let plain = backdated_item(2, MemoryKind::Semantic, "likes long walks", 0.9, 45);

    let harness = TestHarness::seeded(vec![identity, plain]);
    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let report = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);

    // Only the identity-tagged item sits past its 30-day window.
    assert_eq!(report.drift_reports.len(), 1);
    let drift = &report.drift_reports[0];
    assert_eq!(drift.memory_id, 1);
    assert_eq!(drift.recommended_action, DriftAction::Reconfirm);

    assert_eq!(report.reconfirm_queue.len(), 1);
    assert_eq!(report.reconfirm_queue[0].memory_id, 1);
    assert_eq!(lifecycle.reconfirm_queue(10).len(), 1);
}

#[test]
fn test_unpracticed_procedural_flagged_for_refresh() {
    let harness = TestHarness::seeded(vec![backdated_item(
        1,
        MemoryKind::Procedural,
        "how to rotate the signing keys",
        0.9,
        200,
    )]);

    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let report = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);

    assert_eq!(report.drift_reports.len(), 1);
    let drift = &report.drift_reports[0];
    assert_eq!(drift.recommended_action, DriftAction::Reconfirm);
    assert!(drift.reason.contains("not practiced in 200 days"));
}

#[test]
fn test_decay_preview_projects_curve() {
    let lifecycle = MemoryLifecycle::default();
    let points = lifecycle.decay_preview(MemoryKind::Episodic, 0.8, 60);

    let days: Vec<i64> = points.iter().map(|p| p.day).collect();
    assert_eq!(days, vec![0, 7, 14, 30, 60]);

    assert!((points[0].salience - 0.8).abs() < 1e-9);
    // One and two half-lives out.
    assert!((points[3].salience - 0.4).abs() < 1e-9);
    assert!((points[4].salience - 0.2).abs() < 1e-9);
    assert_eq!(points[3].status, MemoryStatus::Active);
    assert_eq!(points[4].status, MemoryStatus::Stale);
}

#[test]
fn test_processing_without_applying_leaves_store_unchanged() {
    let harness = TestHarness::seeded(vec![backdated_item(
        1,
        MemoryKind::Episodic,
        "a dry-run candidate",
        0.8,
        30,
    )]);

    let mut lifecycle = MemoryLifecycle::new(harness.settings.decay.clone());
    let report = lifecycle.process_memories(&harness.engine.get_all_for_lifecycle(), true, true);
    assert_eq!(report.decay_updates.len(), 1);

    // Nothing was persisted: the pass only computes.
    assert!((harness.engine.trace(1).unwrap().salience - 0.8).abs() < 1e-9);
}
