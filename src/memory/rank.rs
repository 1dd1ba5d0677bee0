//! Pure scoring over `(record, now)` — decay, access reinforcement, and the
//! retrieval composite.
//!
//! Used identically for retrieval ordering and eviction selection. Nothing here
//! fails: out-of-range inputs are clamped, since these functions operate on
//! internally-trusted data.

use chrono::{DateTime, Utc};

use crate::config::{MemoryConfig, RetrievalConfig};
use crate::memory::types::MemoryRecord;

/// Recency decay factor in `(0, 1]`.
///
/// Exponential curve anchored so that `decay(0) = 1.0` and
/// `decay(horizon) = floor_fraction`. Monotonically non-increasing in age.
pub fn decay_factor(age_days: f64, horizon_days: f64, floor_fraction: f64) -> f64 {
    if horizon_days <= 0.0 {
        return 1.0;
    }
    let floor = floor_fraction.clamp(1e-6, 1.0);
    floor.powf(age_days.max(0.0) / horizon_days)
}

/// Importance after decay and access reinforcement, clamped to `[0, 1]`.
///
/// Each access nudges the decayed importance upward proportionally to
/// `ln(1 + access_count)`, so frequently-recalled memories resist decay but can
/// never exceed 1.0.
pub fn effective_importance(record: &MemoryRecord, now: DateTime<Utc>, config: &MemoryConfig) -> f64 {
    let decayed = record.importance
        * decay_factor(
            record.age_days(now),
            config.decay_horizon_days,
            config.decay_floor_fraction,
        );
    let boost = config.access_weight * (1.0 + record.access_count as f64).ln();
    (decayed + boost).clamp(0.0, 1.0)
}

/// Convert an L2 distance to a similarity in `(0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f64 {
    1.0 / (1.0 + f64::from(distance.max(0.0)))
}

/// Composite retrieval rank: weighted sum of similarity and effective importance.
pub fn retrieval_score(
    similarity: f64,
    effective_importance: f64,
    weights: &RetrievalConfig,
) -> f64 {
    weights.similarity_weight * similarity + weights.importance_weight * effective_importance
}

/// Eviction rank — effective importance alone, no similarity term.
pub fn eviction_score(record: &MemoryRecord, now: DateTime<Utc>, config: &MemoryConfig) -> f64 {
    effective_importance(record, now, config)
}
