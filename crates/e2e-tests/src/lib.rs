//! End-to-end test infrastructure for mnemon.
//!
//! Provides a shared `TestHarness` and item builders for tests that walk
//! the full store -> index -> lifecycle -> recall path the way a real
//! deployment would.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use mnemon_engine::MemoryEngine;
use mnemon_policy::{MemoryPolicy, OperatingMode};
use mnemon_store::LongTermMemory;
use mnemon_types::{MemoryItem, MemoryKind, Settings};

/// Shared test harness: a temp data dir plus an engine opened on it.
pub struct TestHarness {
    /// Keeps the temp dir alive for the lifetime of the harness
    pub _temp_dir: TempDir,
    pub settings: Settings,
    pub engine: MemoryEngine,
    /// Present when the harness was built with policy hooks attached
    pub policy: Option<Arc<MemoryPolicy>>,
}

impl TestHarness {
    /// Engine with no policy hooks attached.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = test_settings(&temp_dir);
        let engine = MemoryEngine::open(&settings).expect("Failed to open test engine");
        Self {
            _temp_dir: temp_dir,
            settings,
            engine,
            policy: None,
        }
    }

    /// Engine with the standard policy wired into both hook points.
    pub fn with_policy(mode: OperatingMode) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = test_settings(&temp_dir);
        let policy = Arc::new(MemoryPolicy::new(settings.policy.clone()));
        policy.set_mode(mode);
        let engine = MemoryEngine::open(&settings)
            .expect("Failed to open test engine")
            .with_store_policy(policy.clone())
            .with_recall_policy(policy.clone());
        Self {
            _temp_dir: temp_dir,
            settings,
            engine,
            policy: Some(policy),
        }
    }

    /// Plant items straight into the store, then open the engine on top.
    ///
    /// The public API timestamps everything with now; seeding the store
    /// directly is how tests get backdated history.
    pub fn seeded(items: Vec<MemoryItem>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = test_settings(&temp_dir);
        {
            let store = LongTermMemory::open(settings.expanded_data_dir())
                .expect("Failed to open seed store");
            for item in items {
                store.store(item).expect("Failed to seed item");
            }
        }
        let engine = MemoryEngine::open(&settings).expect("Failed to open test engine");
        Self {
            _temp_dir: temp_dir,
            settings,
            engine,
            policy: None,
        }
    }

    /// Drop the engine and open a fresh one on the same data dir,
    /// simulating a process restart.
    pub fn restart(self) -> Self {
        let TestHarness {
            _temp_dir,
            settings,
            engine,
            policy: _,
        } = self;
        drop(engine);
        let engine = MemoryEngine::open(&settings).expect("Failed to reopen test engine");
        TestHarness {
            _temp_dir,
            settings,
            engine,
            policy: None,
        }
    }

    /// Switch the attached policy's operating mode.
    ///
    /// Panics when the harness was built without a policy.
    pub fn set_mode(&self, mode: OperatingMode) {
        self.policy
            .as_ref()
            .expect("harness has no policy attached")
            .set_mode(mode);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn test_settings(temp_dir: &TempDir) -> Settings {
    Settings {
        data_dir: temp_dir.path().to_string_lossy().into_owned(),
        ..Settings::default()
    }
}

/// An item created `days_ago` in the past and never recalled since.
pub fn backdated_item(
    id: u64,
    kind: MemoryKind,
    payload: &str,
    salience: f64,
    days_ago: i64,
) -> MemoryItem {
    let mut item = MemoryItem::new(id, kind, payload);
    item.salience = salience;
    item.created_at = Utc::now() - Duration::days(days_ago);
    item
}
