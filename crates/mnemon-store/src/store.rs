//! Authoritative long-term memory store.
//!
//! State lives in one JSON file per memory kind under `<data_dir>/memory/`,
//! plus a metadata file carrying the id counter. Every mutation rewrites
//! the full set of files; writes are atomic per file and the in-memory map
//! is rolled back when a rewrite fails, so memory and disk cannot diverge
//! past a returned error.
//!
//! A combined legacy file (`<data_dir>/memory.json`) is kept in lockstep
//! for older readers and is migrated into the per-kind layout when it is
//! the only state present.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use mnemon_types::{MemoryItem, MemoryKind};

use crate::error::StoreError;
use crate::files::{parse_items_lenient, read_json_lenient, write_json_atomic};
use crate::snapshot::MemorySnapshot;

/// Version string written into every file this store produces.
pub const STORE_FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
struct StoreInner {
    items: BTreeMap<u64, MemoryItem>,
    next_id: u64,
}

/// Durable, mutex-guarded memory store. The index is rebuilt from this
/// store at startup; this store is the source of truth.
#[derive(Debug)]
pub struct LongTermMemory {
    data_dir: PathBuf,
    memory_dir: PathBuf,
    inner: Mutex<StoreInner>,
}

impl LongTermMemory {
    /// Open the store at `data_dir`, eagerly loading all memory files.
    ///
    /// Corrupt records (and whole unreadable files) are skipped with a
    /// warning. When the per-kind files hold nothing but a legacy combined
    /// file exists, its contents are migrated and persisted in the new
    /// layout.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        let memory_dir = data_dir.join("memory");
        fs::create_dir_all(&memory_dir)?;

        let store = Self {
            data_dir,
            memory_dir,
            inner: Mutex::new(StoreInner {
                items: BTreeMap::new(),
                next_id: 1,
            }),
        };
        store.load()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Mutations roll back before returning an error, so the map stays
        // coherent even if a previous caller panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn kind_path(&self, kind: MemoryKind) -> PathBuf {
        self.memory_dir.join(format!("{kind}_memory.json"))
    }

    fn meta_path(&self) -> PathBuf {
        self.memory_dir.join("memory_meta.json")
    }

    fn legacy_path(&self) -> PathBuf {
        self.data_dir.join("memory.json")
    }

    fn load(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if let Some(meta) = read_json_lenient(&self.meta_path()) {
            inner.next_id = meta.get("next_id").and_then(Value::as_u64).unwrap_or(1);
        }

        for kind in MemoryKind::ALL {
            let path = self.kind_path(kind);
            let Some(document) = read_json_lenient(&path) else {
                continue;
            };
            let records = match document.get("items") {
                Some(Value::Array(records)) => records.clone(),
                _ => {
                    warn!(path = %path.display(), "memory file has no items array, skipping");
                    continue;
                }
            };
            for item in parse_items_lenient(&records, &format!("{kind} file")) {
                inner.items.insert(item.id, item);
            }
        }

        reconcile_next_id(&mut inner);

        if inner.items.is_empty() && self.legacy_path().exists() {
            self.migrate_legacy(&mut inner)?;
        }

        info!(
            count = inner.items.len(),
            next_id = inner.next_id,
            data_dir = %self.data_dir.display(),
            "long-term memory loaded"
        );
        Ok(())
    }

    /// One-time migration from the combined legacy file into the per-kind
    /// layout. Runs only when the per-kind files produced no items.
    fn migrate_legacy(&self, inner: &mut StoreInner) -> Result<(), StoreError> {
        let Some(document) = read_json_lenient(&self.legacy_path()) else {
            return Ok(());
        };
        let records = match document.get("items") {
            Some(Value::Array(records)) => records.clone(),
            _ => return Ok(()),
        };

        for item in parse_items_lenient(&records, "legacy file") {
            inner.items.insert(item.id, item);
        }
        if let Some(next_id) = document.get("next_id").and_then(Value::as_u64) {
            inner.next_id = inner.next_id.max(next_id);
        }
        reconcile_next_id(inner);

        if inner.items.is_empty() {
            return Ok(());
        }

        self.save_locked(inner)?;
        info!(
            count = inner.items.len(),
            "migrated legacy memory file into per-kind layout"
        );
        Ok(())
    }

    /// Rewrite every file from the in-memory state. Caller holds the lock.
    fn save_locked(&self, inner: &StoreInner) -> Result<(), StoreError> {
        for kind in MemoryKind::ALL {
            let items: Vec<&MemoryItem> =
                inner.items.values().filter(|item| item.kind == kind).collect();
            write_json_atomic(
                &self.kind_path(kind),
                &json!({
                    "version": STORE_FORMAT_VERSION,
                    "items": items,
                }),
            )?;
        }

        write_json_atomic(
            &self.meta_path(),
            &json!({
                "version": STORE_FORMAT_VERSION,
                "next_id": inner.next_id,
            }),
        )?;

        let all: Vec<&MemoryItem> = inner.items.values().collect();
        write_json_atomic(
            &self.legacy_path(),
            &json!({
                "version": STORE_FORMAT_VERSION,
                "next_id": inner.next_id,
                "items": all,
            }),
        )?;

        Ok(())
    }

    /// Reserve the next id. Strictly increasing for the life of the store;
    /// the counter is persisted with the next successful save.
    pub fn next_id(&self) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Persist an item under its id.
    pub fn store(&self, item: MemoryItem) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let id = item.id;
        let previous = inner.items.insert(id, item);

        if let Err(err) = self.save_locked(&inner) {
            match previous {
                Some(prev) => inner.items.insert(id, prev),
                None => inner.items.remove(&id),
            };
            return Err(err);
        }
        debug!(id, "memory stored");
        Ok(())
    }

    /// Persist a new state for an existing item.
    ///
    /// The version counter is bumped from the previously stored value.
    /// Returns the canonical stored copy so the caller can re-index exactly
    /// what was persisted, or `None` when the id is unknown.
    pub fn update(&self, mut item: MemoryItem) -> Result<Option<MemoryItem>, StoreError> {
        let mut inner = self.lock();
        let Some(previous) = inner.items.get(&item.id).cloned() else {
            return Ok(None);
        };

        item.version = previous.version + 1;
        let id = item.id;
        inner.items.insert(id, item.clone());

        if let Err(err) = self.save_locked(&inner) {
            inner.items.insert(id, previous);
            return Err(err);
        }
        debug!(id, version = item.version, "memory updated");
        Ok(Some(item))
    }

    /// Delete one item. Returns false when the id is unknown.
    pub fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(previous) = inner.items.remove(&id) else {
            return Ok(false);
        };

        if let Err(err) = self.save_locked(&inner) {
            inner.items.insert(id, previous);
            return Err(err);
        }
        debug!(id, "memory deleted");
        Ok(true)
    }

    /// Delete a batch of ids with a single rewrite. Unknown ids are
    /// ignored. Returns the number actually removed.
    pub fn delete_many(&self, ids: &[u64]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let mut removed = Vec::new();
        for id in ids {
            if let Some(item) = inner.items.remove(id) {
                removed.push(item);
            }
        }
        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(err) = self.save_locked(&inner) {
            for item in removed {
                inner.items.insert(item.id, item);
            }
            return Err(err);
        }
        debug!(count = removed.len(), "memories deleted");
        Ok(removed.len())
    }

    /// Clone of one stored item.
    pub fn get(&self, id: u64) -> Option<MemoryItem> {
        self.lock().items.get(&id).cloned()
    }

    /// Clones of every stored item, in id order.
    pub fn get_all(&self) -> Vec<MemoryItem> {
        self.lock().items.values().cloned().collect()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Full copy of the store state.
    pub fn export_state(&self) -> MemorySnapshot {
        let inner = self.lock();
        MemorySnapshot {
            version: STORE_FORMAT_VERSION.to_string(),
            next_id: inner.next_id,
            items: inner.items.values().cloned().collect(),
        }
    }

    /// Replace the store state with a snapshot and persist it.
    ///
    /// The id counter is reconciled against the imported items so ids stay
    /// strictly increasing even when the snapshot carries a stale counter.
    /// Returns the number of items imported.
    pub fn import_state(&self, snapshot: MemorySnapshot) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let previous_items = std::mem::take(&mut inner.items);
        let previous_next_id = inner.next_id;

        for item in snapshot.items {
            inner.items.insert(item.id, item);
        }
        inner.next_id = snapshot.next_id.max(1);
        reconcile_next_id(&mut inner);

        if let Err(err) = self.save_locked(&inner) {
            inner.items = previous_items;
            inner.next_id = previous_next_id;
            return Err(err);
        }

        let count = inner.items.len();
        info!(count, next_id = inner.next_id, "memory state imported");
        Ok(count)
    }
}

/// Keep the id counter ahead of every stored id.
fn reconcile_next_id(inner: &mut StoreInner) {
    if let Some(max_id) = inner.items.keys().next_back().copied() {
        inner.next_id = inner.next_id.max(max_id + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_types::MemoryStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample(id: u64, kind: MemoryKind) -> MemoryItem {
        MemoryItem::new(id, kind, format!("payload {id}"))
    }

    #[test]
    fn test_open_empty_dir() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 1);
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn test_store_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();

        store.store(sample(1, MemoryKind::Semantic)).unwrap();

        let memory_dir = dir.path().join("memory");
        assert!(memory_dir.join("semantic_memory.json").exists());
        assert!(memory_dir.join("procedural_memory.json").exists());
        assert!(memory_dir.join("episodic_memory.json").exists());
        assert!(memory_dir.join("memory_meta.json").exists());
        assert!(dir.path().join("memory.json").exists());
    }

    #[test]
    fn test_items_split_by_kind() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();

        store.store(sample(1, MemoryKind::Semantic)).unwrap();
        store.store(sample(2, MemoryKind::Episodic)).unwrap();

        let semantic: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("memory/semantic_memory.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(semantic["items"].as_array().unwrap().len(), 1);
        assert_eq!(semantic["items"][0]["id"], 1);

        let episodic: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("memory/episodic_memory.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(episodic["items"][0]["id"], 2);
    }

    #[test]
    fn test_reload_restores_state_and_counter() {
        let dir = TempDir::new().unwrap();
        {
            let store = LongTermMemory::open(dir.path()).unwrap();
            let id = store.next_id();
            store.store(sample(id, MemoryKind::Semantic)).unwrap();
            let id = store.next_id();
            store.store(sample(id, MemoryKind::Procedural)).unwrap();
        }

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(1).is_some());
        assert!(store.get(2).is_some());
        // Counter continues past everything ever assigned.
        assert_eq!(store.next_id(), 3);
    }

    #[test]
    fn test_counter_reconciled_from_items_when_meta_stale() {
        let dir = TempDir::new().unwrap();
        {
            let store = LongTermMemory::open(dir.path()).unwrap();
            store.store(sample(7, MemoryKind::Semantic)).unwrap();
        }
        // Stale meta claiming a lower counter.
        write_json_atomic(
            &dir.path().join("memory/memory_meta.json"),
            &json!({"version": "0.5.4", "next_id": 2}),
        )
        .unwrap();

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.next_id(), 8);
    }

    #[test]
    fn test_update_bumps_version_and_returns_stored_copy() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();
        store.store(sample(1, MemoryKind::Semantic)).unwrap();

        let mut changed = store.get(1).unwrap();
        changed.status = MemoryStatus::Stale;
        changed.version = 999; // caller-side value is ignored

        let stored = store.update(changed).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, MemoryStatus::Stale);
        assert_eq!(store.get(1).unwrap().version, 2);
    }

    #[test]
    fn test_update_unknown_id_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();
        assert!(store.update(sample(42, MemoryKind::Semantic)).unwrap().is_none());
    }

    #[test]
    fn test_delete_and_delete_many() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();
        for id in 1..=4 {
            store.store(sample(id, MemoryKind::Semantic)).unwrap();
        }

        assert!(store.delete(1).unwrap());
        assert!(!store.delete(1).unwrap());
        assert_eq!(store.delete_many(&[2, 3, 99]).unwrap(), 2);
        assert_eq!(store.len(), 1);

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(4).is_some());
    }

    #[test]
    fn test_corrupt_records_are_skipped_on_load() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("memory")).unwrap();
        fs::write(
            dir.path().join("memory/semantic_memory.json"),
            serde_json::to_string(&json!({
                "version": "0.5.4",
                "items": [
                    {"id": 1, "type": "semantic", "payload": "good"},
                    {"payload": "missing id"},
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1).unwrap().payload, "good");
    }

    #[test]
    fn test_legacy_migration() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("memory.json"),
            serde_json::to_string(&json!({
                "version": "0.5.4",
                "next_id": 11,
                "items": [
                    {"id": 5, "type": "semantic", "payload": "from legacy"},
                    {"id": 10, "type": "episodic", "payload": "also legacy"},
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(5).unwrap().payload, "from legacy");
        assert_eq!(store.next_id(), 11);

        // Migration persisted the per-kind layout.
        assert!(dir.path().join("memory/semantic_memory.json").exists());
        let semantic: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("memory/semantic_memory.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(semantic["items"][0]["id"], 5);
    }

    #[test]
    fn test_legacy_ignored_when_kind_files_have_items() {
        let dir = TempDir::new().unwrap();
        {
            let store = LongTermMemory::open(dir.path()).unwrap();
            store.store(sample(1, MemoryKind::Semantic)).unwrap();
        }
        // Tamper with the legacy mirror; the per-kind files win.
        fs::write(
            dir.path().join("memory.json"),
            serde_json::to_string(&json!({
                "version": "0.5.4",
                "next_id": 99,
                "items": [{"id": 50, "type": "semantic", "payload": "stale"}]
            }))
            .unwrap(),
        )
        .unwrap();

        let store = LongTermMemory::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(50).is_none());
    }

    #[test]
    fn test_export_import_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LongTermMemory::open(dir.path()).unwrap();
        store.store(sample(1, MemoryKind::Semantic)).unwrap();
        store.store(sample(2, MemoryKind::Procedural)).unwrap();

        let snapshot = store.export_state();
        assert_eq!(snapshot.items.len(), 2);

        let other_dir = TempDir::new().unwrap();
        let other = LongTermMemory::open(other_dir.path()).unwrap();
        assert_eq!(other.import_state(snapshot).unwrap(), 2);
        assert_eq!(other.get(1).unwrap().payload, "payload 1");

        // Import replaces, never merges.
        let snapshot = MemorySnapshot {
            version: STORE_FORMAT_VERSION.to_string(),
            next_id: 1,
            items: vec![sample(9, MemoryKind::Episodic)],
        };
        other.import_state(snapshot).unwrap();
        assert_eq!(other.len(), 1);
        assert!(other.get(1).is_none());
        // Stale snapshot counter is reconciled past the imported ids.
        assert_eq!(other.next_id(), 10);
    }
}
