//! Batch lifecycle passes over memory items.
//!
//! [`MemoryLifecycle`] never mutates items. A pass reads a batch, computes
//! decayed salience and drift flags, and hands back a [`LifecycleReport`];
//! the caller decides what to write back through the engine.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mnemon_types::{DecayConfig, MemoryItem, MemoryKind, MemoryStatus};

use crate::decay::{self, round4, DecayPoint};
use crate::drift::{self, DriftAction, DriftReport};

/// Smallest salience change worth reporting in a decay update.
const REPORT_THRESHOLD: f64 = 0.01;

/// A salience/status change computed by a lifecycle pass, to be applied by
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayUpdate {
    pub id: u64,
    pub old_salience: f64,
    /// Decayed salience, rounded to four decimals.
    pub new_salience: f64,
    pub old_status: MemoryStatus,
    pub new_status: MemoryStatus,
}

/// An item flagged for user re-confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconfirmationItem {
    pub memory_id: u64,
    pub kind: MemoryKind,
    pub payload_preview: String,
    /// Salience at the moment the item was flagged.
    pub original_salience: f64,
    pub flagged_at: chrono::DateTime<Utc>,
    pub reason: String,
}

/// Counts for one lifecycle pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LifecycleSummary {
    /// Items handed to the pass, including skipped archived ones.
    pub processed: usize,
    pub decay_changes: usize,
    pub drift_detected: usize,
    pub needs_reconfirm: usize,
}

/// Everything one lifecycle pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    pub decay_updates: Vec<DecayUpdate>,
    pub drift_reports: Vec<DriftReport>,
    /// Items this pass newly flagged for re-confirmation.
    pub reconfirm_queue: Vec<ReconfirmationItem>,
    pub summary: LifecycleSummary,
}

/// Runs decay and drift passes and keeps the re-confirmation queue.
#[derive(Debug)]
pub struct MemoryLifecycle {
    config: DecayConfig,
    reconfirm_queue: Vec<ReconfirmationItem>,
}

impl Default for MemoryLifecycle {
    fn default() -> Self {
        Self::new(DecayConfig::default())
    }
}

impl MemoryLifecycle {
    pub fn new(config: DecayConfig) -> Self {
        Self {
            config,
            reconfirm_queue: Vec::new(),
        }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Run one pass over a batch of items.
    ///
    /// Archived items are skipped: archival is terminal until an explicit
    /// reconfirm. When `apply_decay` is set, the decayed salience (not the
    /// stored one) feeds drift detection. A [`DecayUpdate`] is emitted only
    /// when salience moved more than 0.01 or the recommended status differs.
    /// Items whose drift action is `reconfirm` are appended to the internal
    /// queue.
    pub fn process_memories(
        &mut self,
        items: &[MemoryItem],
        apply_decay: bool,
        detect_drift: bool,
    ) -> LifecycleReport {
        let now = Utc::now();
        let mut decay_updates = Vec::new();
        let mut drift_reports = Vec::new();
        let mut reconfirm_items = Vec::new();

        for item in items {
            if item.status == MemoryStatus::Archived {
                continue;
            }

            let mut effective_salience = item.salience;

            if apply_decay {
                let new_salience = decay::calculate_decay(&self.config, item, now);
                let new_status = decay::recommended_status(&self.config, new_salience);

                if (new_salience - item.salience).abs() > REPORT_THRESHOLD
                    || new_status != item.status
                {
                    decay_updates.push(DecayUpdate {
                        id: item.id,
                        old_salience: item.salience,
                        new_salience: round4(new_salience),
                        old_status: item.status,
                        new_status,
                    });
                }

                effective_salience = new_salience;
            }

            if detect_drift {
                if let Some(report) =
                    drift::detect_drift(&self.config, item, effective_salience, now)
                {
                    if report.recommended_action == DriftAction::Reconfirm {
                        reconfirm_items.push(ReconfirmationItem {
                            memory_id: item.id,
                            kind: item.kind,
                            payload_preview: report.payload_preview.clone(),
                            original_salience: effective_salience,
                            flagged_at: now,
                            reason: report.reason.clone(),
                        });
                    }
                    drift_reports.push(report);
                }
            }
        }

        self.reconfirm_queue.extend(reconfirm_items.iter().cloned());

        let summary = LifecycleSummary {
            processed: items.len(),
            decay_changes: decay_updates.len(),
            drift_detected: drift_reports.len(),
            needs_reconfirm: reconfirm_items.len(),
        };
        debug!(
            processed = summary.processed,
            decay_changes = summary.decay_changes,
            drift_detected = summary.drift_detected,
            needs_reconfirm = summary.needs_reconfirm,
            "lifecycle pass complete"
        );

        LifecycleReport {
            decay_updates,
            drift_reports,
            reconfirm_queue: reconfirm_items,
            summary,
        }
    }

    /// First `limit` items awaiting re-confirmation, oldest flags first.
    pub fn reconfirm_queue(&self, limit: usize) -> &[ReconfirmationItem] {
        let end = limit.min(self.reconfirm_queue.len());
        &self.reconfirm_queue[..end]
    }

    /// Drop a memory from the re-confirmation queue. Returns whether
    /// anything was removed.
    pub fn clear_reconfirm_item(&mut self, memory_id: u64) -> bool {
        let before = self.reconfirm_queue.len();
        self.reconfirm_queue.retain(|item| item.memory_id != memory_id);
        self.reconfirm_queue.len() < before
    }

    /// Empty the re-confirmation queue, returning how many were dropped.
    pub fn clear_reconfirm_queue(&mut self) -> usize {
        let count = self.reconfirm_queue.len();
        self.reconfirm_queue.clear();
        count
    }

    /// Project decay for a salience value without touching any state.
    pub fn decay_preview(
        &self,
        kind: MemoryKind,
        current_salience: f64,
        days_ahead: i64,
    ) -> Vec<DecayPoint> {
        decay::estimate_decay_preview(&self.config, kind, current_salience, days_ahead)
    }
}
