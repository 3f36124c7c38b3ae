//! Drift detection: flag items that look stale or due for re-confirmation.
//!
//! Drift is a heuristic, independent of the status the decay thresholds
//! recommend. An item is flagged at most once per pass, with the checks
//! applied in order: salience floor breaches first, then the usage windows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use mnemon_types::{DecayConfig, MemoryItem, MemoryKind};

const PREVIEW_LEN: usize = 80;

/// What a drift report suggests the caller do about the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAction {
    /// Ask the user to re-confirm the memory is still true.
    Reconfirm,
    /// Salience has collapsed; archive it.
    Archive,
    /// Worth a look, no forced action.
    Review,
    /// No action needed.
    Keep,
}

impl fmt::Display for DriftAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftAction::Reconfirm => write!(f, "reconfirm"),
            DriftAction::Archive => write!(f, "archive"),
            DriftAction::Review => write!(f, "review"),
            DriftAction::Keep => write!(f, "keep"),
        }
    }
}

/// One flagged item from a drift pass.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub memory_id: u64,
    pub kind: MemoryKind,
    /// First 80 characters of the payload.
    pub payload_preview: String,
    /// Salience the check ran against (decayed when decay ran first).
    pub salience: f64,
    pub days_since_use: i64,
    pub reason: String,
    pub recommended_action: DriftAction,
}

/// Check a single item for drift.
///
/// `effective_salience` is the value to test, usually the freshly decayed
/// one. Returns `None` when nothing is wrong. Checks run in order:
///
/// 1. salience at or below the archive threshold
/// 2. salience at or below the stale threshold
/// 3. procedural item unused past the refresh window
/// 4. item unused past the reconfirm window, stricter for identity items
pub fn detect_drift(
    config: &DecayConfig,
    item: &MemoryItem,
    effective_salience: f64,
    now: DateTime<Utc>,
) -> Option<DriftReport> {
    let days_since_use = item.idle_days(now);
    let is_identity = item.is_identity();

    let (reason, action) = if effective_salience <= config.archive_threshold {
        (
            format!(
                "Very low salience ({effective_salience:.3}), memory has decayed significantly"
            ),
            DriftAction::Archive,
        )
    } else if effective_salience <= config.stale_threshold {
        (
            format!("Low salience ({effective_salience:.3}), memory becoming stale"),
            DriftAction::Review,
        )
    } else if item.kind == MemoryKind::Procedural
        && days_since_use >= config.procedural_refresh_days
    {
        (
            format!("Procedural memory not practiced in {days_since_use} days"),
            DriftAction::Reconfirm,
        )
    } else {
        let window = if is_identity {
            config.identity_reconfirm_days
        } else {
            config.reconfirm_after_days
        };
        if days_since_use < window {
            return None;
        }
        let action = if is_identity {
            DriftAction::Reconfirm
        } else {
            DriftAction::Review
        };
        (format!("Not accessed in {days_since_use} days"), action)
    };

    Some(DriftReport {
        memory_id: item.id,
        kind: item.kind,
        payload_preview: payload_preview(&item.payload),
        salience: effective_salience,
        days_since_use,
        reason,
        recommended_action: action,
    })
}

fn payload_preview(payload: &str) -> String {
    if payload.chars().count() > PREVIEW_LEN {
        let head: String = payload.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        payload.to_string()
    }
}
