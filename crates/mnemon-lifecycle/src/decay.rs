//! Time-based salience decay.
//!
//! ## Formula
//!
//! ```text
//! salience(t) = max(S0 * 0.5^(days / half_life), salience_floor)
//!
//! where:
//!   half_life = per-kind half-life, stretched by protection_factor
//!               when S0 >= high_salience_protection
//!   days      = fractional days since last_used_at (or created_at)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use mnemon_types::{DecayConfig, MemoryItem, MemoryKind, MemoryStatus};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Day offsets a decay preview projects over.
const PREVIEW_DAYS: [i64; 7] = [0, 7, 14, 30, 60, 90, 180];

/// Decayed salience for an item as of `now`.
///
/// Elapsed time is measured from `last_used_at` when present, else from
/// `created_at`. A non-positive elapsed time returns the input unchanged.
pub fn calculate_decay(config: &DecayConfig, item: &MemoryItem, now: DateTime<Utc>) -> f64 {
    let mut half_life = config.half_life_days(item.kind);
    if item.salience >= config.high_salience_protection {
        half_life *= config.protection_factor;
    }

    let anchor = item.last_used_at.unwrap_or(item.created_at);
    let days_elapsed = (now - anchor).num_seconds() as f64 / SECONDS_PER_DAY;
    if days_elapsed <= 0.0 {
        return item.salience;
    }

    let decay_factor = 0.5_f64.powf(days_elapsed / half_life);
    (item.salience * decay_factor).max(config.salience_floor)
}

/// Status the thresholds recommend for a salience value.
pub fn recommended_status(config: &DecayConfig, salience: f64) -> MemoryStatus {
    if salience <= config.archive_threshold {
        MemoryStatus::Archived
    } else if salience <= config.stale_threshold {
        MemoryStatus::Stale
    } else {
        MemoryStatus::Active
    }
}

/// One projected point in a decay preview.
#[derive(Debug, Clone, Serialize)]
pub struct DecayPoint {
    /// Days from now
    pub day: i64,
    /// Projected salience, rounded to four decimals
    pub salience: f64,
    /// Status the thresholds would recommend at that salience
    pub status: MemoryStatus,
}

/// Project how a salience value will decay, without mutating anything.
///
/// Points follow a fixed day ladder (0, 7, 14, 30, 60, 90, 180) capped at
/// `days_ahead`. The projection uses the plain per-kind half-life; it is an
/// estimate, not a promise about what a lifecycle pass will compute.
pub fn estimate_decay_preview(
    config: &DecayConfig,
    kind: MemoryKind,
    current_salience: f64,
    days_ahead: i64,
) -> Vec<DecayPoint> {
    let half_life = config.half_life_days(kind);
    let mut points = Vec::new();

    for day in PREVIEW_DAYS {
        if day > days_ahead {
            break;
        }
        let decay_factor = 0.5_f64.powf(day as f64 / half_life);
        let salience = round4((current_salience * decay_factor).max(config.salience_floor));
        points.push(DecayPoint {
            day,
            salience,
            status: recommended_status(config, salience),
        });
    }

    points
}

/// Round to four decimals, the precision decay reports carry.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
