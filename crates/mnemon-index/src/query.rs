//! Query contract for index lookups.

use mnemon_types::{MemoryKind, MemoryStatus};
use serde::{Deserialize, Serialize};

/// Filter set for index queries.
///
/// Filters combine by intersection. The tag filter matches items carrying
/// any of the requested tags (a union within the filter). An empty query
/// matches everything up to `limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Restrict to one memory kind
    #[serde(default)]
    pub kind: Option<MemoryKind>,

    /// Restrict to items carrying at least one of these tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// Restrict to one module partition
    #[serde(default)]
    pub module_tag: Option<String>,

    /// Restrict to one lifecycle status
    #[serde(default)]
    pub status: Option<MemoryStatus>,

    /// Drop items whose salience is below this value
    #[serde(default)]
    pub min_salience: Option<f64>,

    /// Maximum number of results returned
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            kind: None,
            tags: None,
            module_tag: None,
            status: None,
            min_salience: None,
            limit: default_limit(),
        }
    }
}

impl MemoryQuery {
    /// Create an unfiltered query with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one memory kind.
    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to items carrying at least one of the given tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Add a single tag to the tag filter.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    /// Restrict to one module partition.
    pub fn with_module_tag(mut self, module_tag: impl Into<String>) -> Self {
        self.module_tag = Some(module_tag.into());
        self
    }

    /// Restrict to one lifecycle status.
    pub fn with_status(mut self, status: MemoryStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Drop items whose salience is below the given value.
    pub fn with_min_salience(mut self, min_salience: f64) -> Self {
        self.min_salience = Some(min_salience);
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
