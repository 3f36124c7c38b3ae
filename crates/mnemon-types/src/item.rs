//! Memory item: the unit of long-term storage.
//!
//! Items are classified into three kinds (semantic, procedural, episodic),
//! carry a salience score in `[SALIENCE_FLOOR, 1.0]` that decays over time,
//! and move through a one-directional lifecycle
//! (active -> stale -> archived). Only an explicit reconfirmation moves an
//! item back to active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Provenance metadata attached to a memory item.
///
/// Opaque to the engine: stored and returned verbatim, never indexed.
pub type TraceMap = BTreeMap<String, Value>;

/// Lowest salience an item can hold. Decay clamps to this floor and
/// salience updates never go below it.
pub const SALIENCE_FLOOR: f64 = 0.01;

/// Classification of a memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Facts and stable knowledge
    #[default]
    Semantic,
    /// Skills and how-to knowledge
    Procedural,
    /// Events and experiences tied to a point in time
    Episodic,
}

impl MemoryKind {
    /// All kinds, in the order the store lays out its files.
    pub const ALL: [MemoryKind; 3] = [
        MemoryKind::Semantic,
        MemoryKind::Procedural,
        MemoryKind::Episodic,
    ];

    /// Baseline salience for items stored without an explicit score.
    ///
    /// Procedural knowledge starts highest (it was deliberately taught),
    /// episodic lowest (most of it is routine).
    pub fn default_salience(&self) -> f64 {
        match self {
            MemoryKind::Semantic => 0.6,
            MemoryKind::Procedural => 0.7,
            MemoryKind::Episodic => 0.4,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryKind::Semantic => write!(f, "semantic"),
            MemoryKind::Procedural => write!(f, "procedural"),
            MemoryKind::Episodic => write!(f, "episodic"),
        }
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(MemoryKind::Semantic),
            "procedural" => Ok(MemoryKind::Procedural),
            "episodic" => Ok(MemoryKind::Episodic),
            other => Err(format!("unknown memory kind: {other}")),
        }
    }
}

/// Lifecycle status of a memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    /// Live and returned by default queries
    #[default]
    Active,
    /// Decayed below the stale threshold; still queryable
    Stale,
    /// Decayed below the archive threshold; kept for audit, excluded by
    /// status-filtered queries
    Archived,
    /// Flagged for user confirmation (identity-bearing items)
    PendingConfirmation,
}

impl std::fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryStatus::Active => write!(f, "active"),
            MemoryStatus::Stale => write!(f, "stale"),
            MemoryStatus::Archived => write!(f, "archived"),
            MemoryStatus::PendingConfirmation => write!(f, "pending_confirmation"),
        }
    }
}

impl std::str::FromStr for MemoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MemoryStatus::Active),
            "stale" => Ok(MemoryStatus::Stale),
            "archived" => Ok(MemoryStatus::Archived),
            "pending_confirmation" => Ok(MemoryStatus::PendingConfirmation),
            other => Err(format!("unknown memory status: {other}")),
        }
    }
}

/// Origin of a memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Stated directly by the user
    #[default]
    User,
    /// Produced by the application itself
    System,
    /// Brought in from an external snapshot
    Import,
    /// Inferred rather than observed
    Inference,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemorySource::User => write!(f, "user"),
            MemorySource::System => write!(f, "system"),
            MemorySource::Import => write!(f, "import"),
            MemorySource::Inference => write!(f, "inference"),
        }
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MemorySource::User),
            "system" => Ok(MemorySource::System),
            "import" => Ok(MemorySource::Import),
            "inference" => Ok(MemorySource::Inference),
            other => Err(format!("unknown memory source: {other}")),
        }
    }
}

/// A single long-term memory record.
///
/// Field defaults mirror what older files may omit, so records written by
/// previous versions keep loading. A record without an `id` is corrupt and
/// is skipped by the lenient loaders in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Store-assigned identifier; strictly increasing, never reused
    pub id: u64,

    /// Memory classification; immutable once stored
    #[serde(rename = "type", default)]
    pub kind: MemoryKind,

    /// Retrieval labels; duplicates permitted, order preserved
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// The remembered content
    #[serde(default)]
    pub payload: String,

    /// Creation time; immutable once stored
    #[serde(rename = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Provenance metadata, stored verbatim
    #[serde(default)]
    pub trace: TraceMap,

    /// Group label assigned by cluster binding; not unique
    #[serde(default)]
    pub cluster_id: Option<u64>,

    /// Where the item came from
    #[serde(default)]
    pub source: MemorySource,

    /// Importance score in `[SALIENCE_FLOOR, 1.0]`; decays over time
    #[serde(default = "default_item_salience")]
    pub salience: f64,

    /// Lifecycle status
    #[serde(default)]
    pub status: MemoryStatus,

    /// Caller-supplied certainty in `[0.0, 1.0]`
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Last recall touch; `None` until the item is first recalled
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,

    /// Originating application module, used as an index partition key
    #[serde(default)]
    pub module_tag: Option<String>,

    /// Update counter; bumped on every persisted update
    #[serde(default = "default_version")]
    pub version: u64,
}

fn default_tags() -> Vec<String> {
    vec!["general".to_string()]
}

/// Neutral midpoint used when a record predates the salience field.
fn default_item_salience() -> f64 {
    0.5
}

fn default_confidence() -> f64 {
    1.0
}

fn default_version() -> u64 {
    1
}

impl MemoryItem {
    /// Create an item with the kind's baseline salience and empty metadata.
    ///
    /// Callers set the remaining fields directly; the engine builds items
    /// this way from store requests.
    pub fn new(id: u64, kind: MemoryKind, payload: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            tags: default_tags(),
            payload: payload.into(),
            created_at: Utc::now(),
            trace: TraceMap::new(),
            cluster_id: None,
            source: MemorySource::default(),
            salience: kind.default_salience(),
            status: MemoryStatus::default(),
            confidence: default_confidence(),
            last_used_at: None,
            module_tag: None,
            version: default_version(),
        }
    }

    /// Record a recall touch.
    pub fn touch(&mut self) {
        self.last_used_at = Some(Utc::now());
    }

    /// Days since the item was last recalled, falling back to its creation
    /// time when it has never been touched. Negative when the anchor lies
    /// in the future.
    pub fn idle_days(&self, now: DateTime<Utc>) -> i64 {
        let anchor = self.last_used_at.unwrap_or(self.created_at);
        (now - anchor).num_days()
    }

    /// Whether the item carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the item is identity-bearing: tagged `identity` or owned by
    /// the `identity` module. Such items get stricter reconfirmation
    /// windows.
    pub fn is_identity(&self) -> bool {
        self.has_tag("identity") || self.module_tag.as_deref() == Some("identity")
    }
}
