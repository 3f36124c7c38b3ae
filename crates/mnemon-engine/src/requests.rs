//! Request and report types for the engine's public operations.

use serde::Serialize;
use serde_json::Value;

use mnemon_index::IndexStats;
use mnemon_types::{MemoryKind, MemorySource, MemoryStatus, TraceMap};

/// Everything a caller can say about a new memory.
///
/// Only payload and kind are required; the rest default to the lenient
/// values a bare store would get.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub payload: String,
    pub kind: MemoryKind,
    pub tags: Vec<String>,
    /// Provenance entries copied into the item's trace.
    pub trace: TraceMap,
    pub source: MemorySource,
    /// When unset, the kind's default salience applies.
    pub salience: Option<f64>,
    pub confidence: f64,
    pub module_tag: Option<String>,
    /// When set, the stored item is also pushed into this session's
    /// working memory.
    pub session_id: Option<String>,
}

impl StoreRequest {
    pub fn new(payload: impl Into<String>, kind: MemoryKind) -> Self {
        Self {
            payload: payload.into(),
            kind,
            tags: Vec::new(),
            trace: TraceMap::new(),
            source: MemorySource::default(),
            salience: None,
            confidence: 1.0,
            module_tag: None,
            session_id: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_salience(mut self, salience: f64) -> Self {
        self.salience = Some(salience);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_module_tag(mut self, module_tag: impl Into<String>) -> Self {
        self.module_tag = Some(module_tag.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_trace_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.trace.insert(key.into(), value);
        self
    }
}

/// Filters for a recall. All filters are optional and intersect.
#[derive(Debug, Clone)]
pub struct RecallRequest {
    pub kind: Option<MemoryKind>,
    /// Union within the list, intersected with the other filters.
    pub tags: Option<Vec<String>>,
    pub module_tag: Option<String>,
    pub status: Option<MemoryStatus>,
    pub min_salience: Option<f64>,
    pub limit: usize,
    /// Update `last_used_at` on every hit and persist the touch.
    pub touch: bool,
}

impl Default for RecallRequest {
    fn default() -> Self {
        Self {
            kind: None,
            tags: None,
            module_tag: None,
            status: None,
            min_salience: None,
            limit: 20,
            touch: true,
        }
    }
}

impl RecallRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_module_tag(mut self, module_tag: impl Into<String>) -> Self {
        self.module_tag = Some(module_tag.into());
        self
    }

    pub fn with_status(mut self, status: MemoryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_min_salience(mut self, min_salience: f64) -> Self {
        self.min_salience = Some(min_salience);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Recall without bumping `last_used_at`, for inspection paths.
    pub fn without_touch(mut self) -> Self {
        self.touch = false;
        self
    }
}

/// Which items a forget call removes.
///
/// Tags contribute the union of their id sets; that set intersects with the
/// explicit ids and the kind partition when those are given. An empty
/// filter matches nothing, so a bare `forget` call cannot wipe the store.
#[derive(Debug, Clone, Default)]
pub struct ForgetFilter {
    pub ids: Option<Vec<u64>>,
    pub tags: Option<Vec<String>>,
    pub kind: Option<MemoryKind>,
}

impl ForgetFilter {
    pub fn by_ids(ids: Vec<u64>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn by_tags(tags: Vec<String>) -> Self {
        Self {
            tags: Some(tags),
            ..Self::default()
        }
    }

    pub fn by_kind(kind: MemoryKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.is_empty())
            && self.tags.as_ref().map_or(true, |tags| tags.is_empty())
            && self.kind.is_none()
    }
}

/// Counts by kind and status, plus working-memory occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryHealth {
    pub total: usize,
    pub semantic_entries: usize,
    pub procedural_entries: usize,
    pub episodic_entries: usize,
    pub active: usize,
    pub stale: usize,
    pub archived: usize,
    pub pending_confirmation: usize,
    pub unique_tags: usize,
    pub unique_modules: usize,
    /// Sessions currently holding working memory.
    pub working_sessions: usize,
}

impl MemoryHealth {
    pub(crate) fn from_stats(stats: IndexStats, working_sessions: usize) -> Self {
        Self {
            total: stats.total,
            semantic_entries: stats.semantic,
            procedural_entries: stats.procedural,
            episodic_entries: stats.episodic,
            active: stats.active,
            stale: stats.stale,
            archived: stats.archived,
            pending_confirmation: stats.pending_confirmation,
            unique_tags: stats.unique_tags,
            unique_modules: stats.unique_modules,
            working_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_request_builders() {
        let request = StoreRequest::new("prefers dark mode", MemoryKind::Semantic)
            .with_tag("preference")
            .with_tag("ui")
            .with_source(MemorySource::User)
            .with_salience(0.8)
            .with_module_tag("settings")
            .with_session("s-1")
            .with_trace_entry("origin", Value::String("chat".into()));

        assert_eq!(request.tags, vec!["preference", "ui"]);
        assert_eq!(request.salience, Some(0.8));
        assert_eq!(request.module_tag.as_deref(), Some("settings"));
        assert_eq!(request.session_id.as_deref(), Some("s-1"));
        assert_eq!(request.trace.len(), 1);
    }

    #[test]
    fn test_recall_request_defaults() {
        let request = RecallRequest::new();
        assert_eq!(request.limit, 20);
        assert!(request.touch);
        assert!(request.tags.is_none());

        let request = request.with_tag("preference").without_touch();
        assert_eq!(request.tags.as_deref(), Some(&["preference".to_string()][..]));
        assert!(!request.touch);
    }

    #[test]
    fn test_forget_filter_emptiness() {
        assert!(ForgetFilter::default().is_empty());
        assert!(ForgetFilter::by_ids(vec![]).is_empty());
        assert!(!ForgetFilter::by_ids(vec![1]).is_empty());
        assert!(!ForgetFilter::by_tags(vec!["t".into()]).is_empty());
        assert!(!ForgetFilter::default().with_kind(MemoryKind::Semantic).is_empty());
    }
}
