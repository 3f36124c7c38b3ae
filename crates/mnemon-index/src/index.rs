//! Multi-key inverted index over memory items.
//!
//! The index owns a canonical copy of every item (`by_id`) plus membership
//! partitions keyed by kind, tag, module and status. All access goes
//! through one internal mutex, so every mutation lands in all partitions
//! before any reader can observe it.
//!
//! Updates always remove the previously indexed copy before inserting the
//! new one. The old copy is resolved from `by_id` itself, never taken from
//! the caller, so partition memberships cannot go stale.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use mnemon_types::{MemoryItem, MemoryKind, MemoryStatus};

use crate::query::MemoryQuery;

#[derive(Debug, Default)]
struct IndexInner {
    by_id: BTreeMap<u64, MemoryItem>,
    by_kind: HashMap<MemoryKind, BTreeSet<u64>>,
    by_tag: HashMap<String, BTreeSet<u64>>,
    by_module: HashMap<String, BTreeSet<u64>>,
    by_status: HashMap<MemoryStatus, BTreeSet<u64>>,
}

impl IndexInner {
    fn attach(&mut self, item: MemoryItem) {
        let id = item.id;
        self.by_kind.entry(item.kind).or_default().insert(id);
        for tag in &item.tags {
            self.by_tag.entry(tag.clone()).or_default().insert(id);
        }
        if let Some(module) = &item.module_tag {
            self.by_module.entry(module.clone()).or_default().insert(id);
        }
        self.by_status.entry(item.status).or_default().insert(id);
        self.by_id.insert(id, item);
    }

    fn detach(&mut self, id: u64) -> Option<MemoryItem> {
        let item = self.by_id.remove(&id)?;
        if let Some(set) = self.by_kind.get_mut(&item.kind) {
            set.remove(&id);
            if set.is_empty() {
                self.by_kind.remove(&item.kind);
            }
        }
        for tag in &item.tags {
            if let Some(set) = self.by_tag.get_mut(tag) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
        if let Some(module) = &item.module_tag {
            if let Some(set) = self.by_module.get_mut(module) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_module.remove(module);
                }
            }
        }
        if let Some(set) = self.by_status.get_mut(&item.status) {
            set.remove(&id);
            if set.is_empty() {
                self.by_status.remove(&item.status);
            }
        }
        Some(item)
    }
}

/// Aggregate counts over the index, used for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    /// Total indexed items
    pub total: usize,
    /// Items per kind
    pub semantic: usize,
    /// Items per kind
    pub procedural: usize,
    /// Items per kind
    pub episodic: usize,
    /// Items per status
    pub active: usize,
    /// Items per status
    pub stale: usize,
    /// Items per status
    pub archived: usize,
    /// Items per status
    pub pending_confirmation: usize,
    /// Distinct tags with at least one member
    pub unique_tags: usize,
    /// Distinct module tags with at least one member
    pub unique_modules: usize,
}

/// Multi-key inverted index. Cheap to query, rebuilt from the store at
/// startup.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    inner: Mutex<IndexInner>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexInner> {
        // A panic while holding the lock leaves the guard poisoned; the
        // partitions themselves are still structurally valid, so keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index an item under all its keys.
    pub fn add(&self, item: MemoryItem) {
        let mut inner = self.lock();
        if inner.by_id.contains_key(&item.id) {
            warn!(id = item.id, "re-adding an indexed id, replacing");
            inner.detach(item.id);
        }
        debug!(id = item.id, kind = %item.kind, "index add");
        inner.attach(item);
    }

    /// Remove an item from every partition. Returns the indexed copy.
    pub fn remove(&self, id: u64) -> Option<MemoryItem> {
        let mut inner = self.lock();
        let removed = inner.detach(id);
        if removed.is_some() {
            debug!(id, "index remove");
        }
        removed
    }

    /// Replace the indexed copy of an item.
    ///
    /// The previous memberships are resolved from the index's own copy and
    /// removed before the new snapshot is inserted, all under one lock.
    /// Unknown ids are inserted as new.
    pub fn update(&self, item: MemoryItem) {
        let mut inner = self.lock();
        inner.detach(item.id);
        inner.attach(item);
    }

    /// Clone of the indexed item, if present.
    pub fn get(&self, id: u64) -> Option<MemoryItem> {
        self.lock().by_id.get(&id).cloned()
    }

    /// Whether the id is indexed.
    pub fn contains(&self, id: u64) -> bool {
        self.lock().by_id.contains_key(&id)
    }

    /// Ids currently indexed under the given kind.
    pub fn ids_for_kind(&self, kind: MemoryKind) -> BTreeSet<u64> {
        self.lock().by_kind.get(&kind).cloned().unwrap_or_default()
    }

    /// Ids currently indexed under the given tag.
    pub fn ids_for_tag(&self, tag: &str) -> BTreeSet<u64> {
        self.lock().by_tag.get(tag).cloned().unwrap_or_default()
    }

    /// Run a filtered query.
    ///
    /// Candidate ids are the intersection of the requested partitions,
    /// where the tag filter contributes the union of its per-tag sets.
    /// Results are filtered by `min_salience`, sorted by salience
    /// descending (ties by ascending id) and truncated to `limit`.
    pub fn query(&self, query: &MemoryQuery) -> Vec<MemoryItem> {
        let inner = self.lock();

        let mut candidates: Option<BTreeSet<u64>> = None;

        if let Some(kind) = query.kind {
            let set = inner.by_kind.get(&kind).cloned().unwrap_or_default();
            candidates = Some(narrow(candidates, set));
        }

        if let Some(tags) = &query.tags {
            if !tags.is_empty() {
                let mut union = BTreeSet::new();
                for tag in tags {
                    if let Some(set) = inner.by_tag.get(tag) {
                        union.extend(set.iter().copied());
                    }
                }
                candidates = Some(narrow(candidates, union));
            }
        }

        if let Some(module) = &query.module_tag {
            let set = inner.by_module.get(module).cloned().unwrap_or_default();
            candidates = Some(narrow(candidates, set));
        }

        if let Some(status) = query.status {
            let set = inner.by_status.get(&status).cloned().unwrap_or_default();
            candidates = Some(narrow(candidates, set));
        }

        let mut items: Vec<MemoryItem> = match candidates {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.by_id.get(id).cloned())
                .collect(),
            None => inner.by_id.values().cloned().collect(),
        };

        if let Some(min) = query.min_salience {
            items.retain(|item| item.salience >= min);
        }

        items.sort_by(|a, b| {
            b.salience
                .partial_cmp(&a.salience)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        items.truncate(query.limit);
        items
    }

    /// Replace the whole index with the given items.
    pub fn rebuild(&self, items: Vec<MemoryItem>) {
        let mut inner = self.lock();
        *inner = IndexInner::default();
        let count = items.len();
        for item in items {
            inner.attach(item);
        }
        debug!(count, "index rebuilt");
    }

    /// Aggregate counts over every partition.
    pub fn stats(&self) -> IndexStats {
        let inner = self.lock();
        let kind_count =
            |kind: MemoryKind| inner.by_kind.get(&kind).map_or(0, |set| set.len());
        let status_count =
            |status: MemoryStatus| inner.by_status.get(&status).map_or(0, |set| set.len());

        IndexStats {
            total: inner.by_id.len(),
            semantic: kind_count(MemoryKind::Semantic),
            procedural: kind_count(MemoryKind::Procedural),
            episodic: kind_count(MemoryKind::Episodic),
            active: status_count(MemoryStatus::Active),
            stale: status_count(MemoryStatus::Stale),
            archived: status_count(MemoryStatus::Archived),
            pending_confirmation: status_count(MemoryStatus::PendingConfirmation),
            unique_tags: inner.by_tag.len(),
            unique_modules: inner.by_module.len(),
        }
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.lock().by_id.is_empty()
    }
}

fn narrow(current: Option<BTreeSet<u64>>, set: BTreeSet<u64>) -> BTreeSet<u64> {
    match current {
        Some(existing) => existing.intersection(&set).copied().collect(),
        None => set,
    }
}
