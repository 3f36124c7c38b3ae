//! Policy hooks for the store and recall paths.
//!
//! The engine holds these as optional trait objects wired once at
//! construction. The capability split is deliberate: a [`StorePolicy`] may
//! mutate the item and veto the store, while a [`RecallPolicy`] only filters
//! and annotates the copies being returned.

use mnemon_types::{MemoryItem, MemorySource, TraceMap};

/// Context handed to a store policy alongside the item itself.
#[derive(Debug, Clone, Default)]
pub struct StoreMeta {
    pub source: MemorySource,
    pub session_id: Option<String>,
}

/// Outcome of a store policy check.
#[derive(Debug, Clone)]
pub enum PolicyVerdict {
    /// Store proceeds. Warnings are logged, not surfaced to the caller.
    Allow { warnings: Vec<String> },
    /// Store aborts before anything is persisted.
    Reject { reason: String },
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        PolicyVerdict::Allow {
            warnings: Vec::new(),
        }
    }

    pub fn allow_with_warnings(warnings: Vec<String>) -> Self {
        PolicyVerdict::Allow { warnings }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        PolicyVerdict::Reject {
            reason: reason.into(),
        }
    }
}

/// Validates and transforms an item before it is persisted.
///
/// Runs after the id is assigned and before any write. The policy may
/// mutate the item in place (tags, salience, trace).
pub trait StorePolicy: Send + Sync {
    fn before_store(&self, item: &mut MemoryItem, meta: &StoreMeta) -> PolicyVerdict;
}

/// Filters and annotates items on the recall path.
///
/// Implementations see the copies the engine is about to return, never the
/// stored state.
pub trait RecallPolicy: Send + Sync {
    /// Whether the item should appear in recall results.
    fn include(&self, item: &MemoryItem) -> bool {
        let _ = item;
        true
    }

    /// Extra trace entries to merge into the returned copy.
    fn annotate(&self, item: &MemoryItem) -> Option<TraceMap> {
        let _ = item;
        None
    }
}
