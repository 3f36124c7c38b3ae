//! Export/import state transfer for long-term memory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mnemon_types::MemoryItem;

use crate::error::StoreError;
use crate::files::parse_items_lenient;

/// A complete copy of long-term memory state, suitable for backup or for
/// moving memories between installations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Format version the snapshot was written with
    pub version: String,

    /// Next id the store would assign
    pub next_id: u64,

    /// Every stored item
    pub items: Vec<MemoryItem>,
}

impl MemorySnapshot {
    /// Parse a snapshot from raw JSON with per-record leniency: corrupt
    /// item records are skipped, but the envelope itself must be an
    /// object.
    pub fn from_value(value: &Value) -> Result<Self, StoreError> {
        let object = value
            .as_object()
            .ok_or_else(|| StoreError::InvalidSnapshot("expected a JSON object".to_string()))?;

        let version = object
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let next_id = object.get("next_id").and_then(Value::as_u64).unwrap_or(1);
        let items = match object.get("items") {
            Some(Value::Array(records)) => parse_items_lenient(records, "snapshot"),
            Some(_) => {
                return Err(StoreError::InvalidSnapshot(
                    "items must be an array".to_string(),
                ))
            }
            None => Vec::new(),
        };

        Ok(Self {
            version,
            next_id,
            items,
        })
    }
}
