//! The engine proper: coordination across store, index, and working memory.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use mnemon_index::{MemoryIndex, MemoryQuery};
use mnemon_lifecycle::DecayUpdate;
use mnemon_store::{LongTermMemory, MemorySnapshot};
use mnemon_types::{MemoryError, MemoryItem, MemoryStatus, Settings};

use crate::hooks::{PolicyVerdict, RecallPolicy, StoreMeta, StorePolicy};
use crate::requests::{ForgetFilter, MemoryHealth, RecallRequest, StoreRequest};
use crate::working::WorkingMemory;

/// Coordinator over the three memory layers.
///
/// Owns one [`LongTermMemory`], one [`MemoryIndex`] rebuilt from it at open,
/// and one [`WorkingMemory`]. Each layer guards its own state, so an
/// operation is atomic per layer, not end to end; the store is authoritative
/// and the index is rebuilt from it on every open.
pub struct MemoryEngine {
    working: WorkingMemory,
    long_term: LongTermMemory,
    index: MemoryIndex,
    store_policy: Option<Arc<dyn StorePolicy>>,
    recall_policy: Option<Arc<dyn RecallPolicy>>,
    salience_floor: f64,
}

impl MemoryEngine {
    /// Open the durable store under the configured data directory and build
    /// the index from it.
    pub fn open(settings: &Settings) -> Result<Self, MemoryError> {
        let long_term = LongTermMemory::open(settings.expanded_data_dir())?;
        let index = MemoryIndex::new();
        index.rebuild(long_term.get_all());
        info!(items = index.len(), "memory engine ready");

        Ok(Self {
            working: WorkingMemory::new(&settings.working_memory),
            long_term,
            index,
            store_policy: None,
            recall_policy: None,
            salience_floor: settings.decay.salience_floor,
        })
    }

    /// Wire the store-path policy. Call once at startup.
    pub fn with_store_policy(mut self, policy: Arc<dyn StorePolicy>) -> Self {
        self.store_policy = Some(policy);
        self
    }

    /// Wire the recall-path policy. Call once at startup.
    pub fn with_recall_policy(mut self, policy: Arc<dyn RecallPolicy>) -> Self {
        self.recall_policy = Some(policy);
        self
    }

    /// Store a new memory.
    ///
    /// Assigns the next id, lets the store policy validate and adjust the
    /// item, persists it, then indexes it. A policy rejection aborts before
    /// anything is written. With a session id the stored item also lands in
    /// that session's working memory.
    pub fn store(&self, request: StoreRequest) -> Result<MemoryItem, MemoryError> {
        let salience = request
            .salience
            .unwrap_or_else(|| request.kind.default_salience());

        let mut item = MemoryItem::new(self.long_term.next_id(), request.kind, request.payload);
        if !request.tags.is_empty() {
            item.tags = request.tags;
        }
        item.trace = request.trace;
        item.source = request.source;
        item.salience = salience;
        item.confidence = request.confidence;
        item.module_tag = request.module_tag;

        if let Some(policy) = &self.store_policy {
            let meta = StoreMeta {
                source: item.source,
                session_id: request.session_id.clone(),
            };
            match policy.before_store(&mut item, &meta) {
                PolicyVerdict::Allow { warnings } => {
                    for warning in warnings {
                        warn!(id = item.id, warning = %warning, "store policy warning");
                    }
                }
                PolicyVerdict::Reject { reason } => {
                    debug!(id = item.id, reason = %reason, "store rejected by policy");
                    return Err(MemoryError::PolicyRejected(reason));
                }
            }
        }

        self.long_term.store(item.clone())?;
        self.index.add(item.clone());

        if let Some(session_id) = &request.session_id {
            self.working.push(session_id, item.clone());
        }

        debug!(id = item.id, kind = %item.kind, "memory stored");
        Ok(item)
    }

    /// Recall memories matching the request's filters.
    ///
    /// When `touch` is set each hit's `last_used_at` is bumped, persisted,
    /// and reindexed before the item is returned. The recall policy then
    /// filters the hits and may annotate the returned copies' traces.
    pub fn recall(&self, request: &RecallRequest) -> Result<Vec<MemoryItem>, MemoryError> {
        let query = MemoryQuery {
            kind: request.kind,
            tags: request.tags.clone(),
            module_tag: request.module_tag.clone(),
            status: request.status,
            min_salience: request.min_salience,
            limit: request.limit,
        };

        let hits = self.index.query(&query);
        let mut result = Vec::with_capacity(hits.len());

        for mut item in hits {
            if request.touch {
                item.touch();
                if let Some(stored) = self.long_term.update(item.clone())? {
                    self.index.update(stored.clone());
                    item = stored;
                }
            }

            if let Some(policy) = &self.recall_policy {
                if !policy.include(&item) {
                    continue;
                }
                if let Some(extra) = policy.annotate(&item) {
                    item.trace.extend(extra);
                }
            }

            result.push(item);
        }

        debug!(returned = result.len(), "recall complete");
        Ok(result)
    }

    /// Delete every memory the filter matches. Returns the count removed.
    ///
    /// Tags contribute the union of their id sets; ids, tags, and kind then
    /// intersect. Deletion hits the store first so the index never outlives
    /// the durable state.
    pub fn forget(&self, filter: &ForgetFilter) -> Result<usize, MemoryError> {
        if filter.is_empty() {
            return Ok(0);
        }

        let mut candidates: Option<BTreeSet<u64>> = None;

        if let Some(ids) = &filter.ids {
            candidates = Some(ids.iter().copied().collect());
        }

        if let Some(tags) = &filter.tags {
            if !tags.is_empty() {
                let mut tag_ids = BTreeSet::new();
                for tag in tags {
                    tag_ids.extend(self.index.ids_for_tag(tag));
                }
                candidates = Some(match candidates {
                    Some(existing) => existing.intersection(&tag_ids).copied().collect(),
                    None => tag_ids,
                });
            }
        }

        if let Some(kind) = filter.kind {
            let kind_ids = self.index.ids_for_kind(kind);
            candidates = Some(match candidates {
                Some(existing) => existing.intersection(&kind_ids).copied().collect(),
                None => kind_ids,
            });
        }

        let ids: Vec<u64> = candidates.unwrap_or_default().into_iter().collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let removed = self.long_term.delete_many(&ids)?;
        for id in &ids {
            self.index.remove(*id);
        }

        info!(removed, "memories forgotten");
        Ok(removed)
    }

    /// Full-field dump of one memory, or `None` if the id is unknown.
    pub fn trace(&self, id: u64) -> Option<MemoryItem> {
        self.index.get(id)
    }

    /// Group the given memories under a fresh cluster id.
    ///
    /// The id is one past the highest cluster id on record (1 when none
    /// exists). Unknown member ids are skipped silently.
    pub fn bind_cluster(&self, ids: &[u64]) -> Result<u64, MemoryError> {
        let cluster_id = self
            .long_term
            .get_all()
            .iter()
            .filter_map(|item| item.cluster_id)
            .max()
            .map_or(1, |max| max + 1);

        let mut members = 0;
        for id in ids {
            let Some(mut item) = self.index.get(*id) else {
                continue;
            };
            item.cluster_id = Some(cluster_id);
            if self.persist_and_reindex(item)? {
                members += 1;
            }
        }

        info!(cluster_id, members, "cluster bound");
        Ok(cluster_id)
    }

    /// Set a memory's salience, clamped to the configured floor and 1.0.
    /// Returns false when the id is unknown.
    pub fn update_salience(&self, id: u64, salience: f64) -> Result<bool, MemoryError> {
        let Some(mut item) = self.index.get(id) else {
            return Ok(false);
        };
        item.salience = salience.clamp(self.salience_floor, 1.0);
        self.persist_and_reindex(item)?;
        Ok(true)
    }

    /// Set a memory's lifecycle status. Returns false when the id is unknown.
    pub fn update_status(&self, id: u64, status: MemoryStatus) -> Result<bool, MemoryError> {
        let Some(mut item) = self.index.get(id) else {
            return Ok(false);
        };
        item.status = status;
        self.persist_and_reindex(item)?;
        Ok(true)
    }

    /// Set the status on a batch of ids. Returns how many actually changed.
    pub fn bulk_update_status(
        &self,
        ids: &[u64],
        status: MemoryStatus,
    ) -> Result<usize, MemoryError> {
        let mut count = 0;
        for id in ids {
            let Some(mut item) = self.index.get(*id) else {
                continue;
            };
            if item.status == status {
                continue;
            }
            item.status = status;
            if self.persist_and_reindex(item)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Restore a memory to active after user confirmation.
    ///
    /// Salience becomes `new_salience` (clamped) when given, otherwise at
    /// least 0.5. The item is touched so decay restarts from now. Returns
    /// false when the id is unknown.
    pub fn reconfirm_memory(
        &self,
        id: u64,
        new_salience: Option<f64>,
    ) -> Result<bool, MemoryError> {
        let Some(mut item) = self.index.get(id) else {
            return Ok(false);
        };

        item.status = MemoryStatus::Active;
        item.salience = match new_salience {
            Some(value) => value.clamp(self.salience_floor, 1.0),
            None => item.salience.max(0.5),
        };
        item.touch();

        self.persist_and_reindex(item)?;
        info!(id, "memory reconfirmed");
        Ok(true)
    }

    /// Every stored memory, for a lifecycle pass. The engine never schedules
    /// lifecycle processing itself.
    pub fn get_all_for_lifecycle(&self) -> Vec<MemoryItem> {
        self.long_term.get_all()
    }

    /// Apply the salience/status changes a lifecycle pass computed.
    /// Returns the count of items that actually changed.
    pub fn apply_decay_updates(&self, updates: &[DecayUpdate]) -> Result<usize, MemoryError> {
        let mut count = 0;

        for update in updates {
            let Some(mut item) = self.index.get(update.id) else {
                continue;
            };

            let mut changed = false;
            if item.salience != update.new_salience {
                item.salience = update.new_salience;
                changed = true;
            }
            if item.status != update.new_status {
                item.status = update.new_status;
                changed = true;
            }

            if changed && self.persist_and_reindex(item)? {
                count += 1;
            }
        }

        if count > 0 {
            info!(count, "decay updates applied");
        }
        Ok(count)
    }

    /// Counts by kind and status plus working-memory occupancy.
    pub fn get_health(&self) -> MemoryHealth {
        MemoryHealth::from_stats(self.index.stats(), self.working.session_count())
    }

    /// Stale memories, highest salience first.
    pub fn stale_memories(&self, limit: usize) -> Vec<MemoryItem> {
        self.index.query(
            &MemoryQuery::new()
                .with_status(MemoryStatus::Stale)
                .with_limit(limit),
        )
    }

    /// Archived memories, highest salience first.
    pub fn archived_memories(&self, limit: usize) -> Vec<MemoryItem> {
        self.index.query(
            &MemoryQuery::new()
                .with_status(MemoryStatus::Archived)
                .with_limit(limit),
        )
    }

    /// Recent working memory for a session, oldest first.
    pub fn working_memory(&self, session_id: &str, limit: usize) -> Vec<MemoryItem> {
        self.working.recent(session_id, limit)
    }

    /// Tear down a session's working memory. Returns the items dropped.
    pub fn clear_working_memory(&self, session_id: &str) -> usize {
        self.working.clear_session(session_id)
    }

    /// Tear down every session at once, e.g. on shutdown.
    pub fn clear_all_working_memory(&self) -> usize {
        self.working.clear_all()
    }

    /// Snapshot the full durable state.
    pub fn export_state(&self) -> MemorySnapshot {
        self.long_term.export_state()
    }

    /// Replace the durable state with a snapshot and rebuild the index.
    /// Returns how many items were imported.
    pub fn import_state(&self, snapshot: MemorySnapshot) -> Result<usize, MemoryError> {
        let imported = self.long_term.import_state(snapshot)?;
        self.index.rebuild(self.long_term.get_all());
        info!(imported, "state imported");
        Ok(imported)
    }

    /// Persist a mutated item and refresh its index entry with the stored
    /// copy. False when the store no longer knows the id.
    fn persist_and_reindex(&self, item: MemoryItem) -> Result<bool, MemoryError> {
        match self.long_term.update(item)? {
            Some(stored) => {
                self.index.update(stored);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
