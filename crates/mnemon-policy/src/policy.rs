//! The policy implementation wired into the engine's hook seams.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use mnemon_engine::{PolicyVerdict, RecallPolicy, StoreMeta, StorePolicy};
use mnemon_types::{MemoryItem, MemoryKind, PolicyConfig, TraceMap, SALIENCE_FLOOR};

use crate::mode::OperatingMode;

/// Version stamped into the trace of every item this policy admits.
pub const POLICY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Validates stores, computes salience, and shapes recall by mode.
///
/// The mode sits behind a mutex so it can be switched while the engine
/// holds the policy behind an `Arc`.
pub struct MemoryPolicy {
    config: PolicyConfig,
    mode: Mutex<OperatingMode>,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl MemoryPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            mode: Mutex::new(OperatingMode::default()),
        }
    }

    /// Current operating mode.
    pub fn mode(&self) -> OperatingMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch the operating mode at runtime.
    pub fn set_mode(&self, mode: OperatingMode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
        debug!(%mode, "operating mode set");
    }

    fn is_identity_tagged(&self, item: &MemoryItem) -> bool {
        item.tags
            .iter()
            .any(|tag| self.config.identity_tags.contains(tag))
    }

    /// Final salience: the requested base plus source and kind adjustments,
    /// clamped to the valid range.
    fn compute_salience(&self, item: &MemoryItem) -> f64 {
        let mut salience = item.salience + self.config.source_modifier(item.source);
        if item.kind == MemoryKind::Procedural {
            salience += self.config.procedural_boost;
        }
        if self.is_identity_tagged(item) {
            salience += self.config.identity_boost;
        }
        salience.clamp(SALIENCE_FLOOR, 1.0)
    }
}

impl StorePolicy for MemoryPolicy {
    fn before_store(&self, item: &mut MemoryItem, meta: &StoreMeta) -> PolicyVerdict {
        let length = item.payload.chars().count();
        if length < self.config.min_payload_len {
            return PolicyVerdict::reject(format!(
                "payload length {length} below minimum {}",
                self.config.min_payload_len
            ));
        }
        if length > self.config.max_payload_len {
            return PolicyVerdict::reject(format!(
                "payload length {length} above maximum {}",
                self.config.max_payload_len
            ));
        }

        let mut warnings = Vec::new();

        if item.tags.is_empty() {
            item.tags.push(self.config.fallback_tag.clone());
            warnings.push(format!(
                "no tags given, defaulted to \"{}\"",
                self.config.fallback_tag
            ));
        }

        // Every item carries its storage month for cheap cohort queries.
        let month_tag = Utc::now().format("%Y-%m").to_string();
        if !item.has_tag(&month_tag) {
            item.tags.push(month_tag);
        }

        item.salience = self.compute_salience(item);

        if self.is_identity_tagged(item) {
            warnings.push("identity-bearing memory stored, ask the user to confirm it".to_string());
        }

        let mode = self.mode();
        item.trace.insert(
            "policy_version".to_string(),
            Value::String(POLICY_VERSION.to_string()),
        );
        item.trace
            .insert("policy_mode".to_string(), Value::String(mode.to_string()));
        if let Some(session_id) = &meta.session_id {
            item.trace
                .insert("session_id".to_string(), Value::String(session_id.clone()));
        }
        item.trace.insert(
            "evaluated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        PolicyVerdict::allow_with_warnings(warnings)
    }
}

impl RecallPolicy for MemoryPolicy {
    fn include(&self, item: &MemoryItem) -> bool {
        let filter = self.mode().filter();
        if filter.exclude_kinds.contains(&item.kind) {
            return false;
        }
        if let Some(min) = filter.min_salience {
            if item.salience < min {
                return false;
            }
        }
        true
    }

    fn annotate(&self, item: &MemoryItem) -> Option<TraceMap> {
        let mode = self.mode();
        if mode == OperatingMode::Normal {
            return None;
        }

        let mut extra = TraceMap::new();
        extra.insert("recall_mode".to_string(), Value::String(mode.to_string()));
        if mode.filter().boost_tags.iter().any(|tag| item.has_tag(tag)) {
            extra.insert("mode_boost".to_string(), Value::Bool(true));
        }
        Some(extra)
    }
}
