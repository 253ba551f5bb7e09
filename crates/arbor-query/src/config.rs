//! Façade defaults and clamp bounds
//!
//! Out-of-range parameters are clamped and logged, never rejected.

use serde::{Deserialize, Serialize};

pub const RESOLUTION_RANGE: (f64, f64) = (0.1, 5.0);
pub const MIN_SIZE_RANGE: (usize, usize) = (1, 100);
pub const TOP_RANGE: (usize, usize) = (1, 50);
pub const LIMIT_RANGE: (usize, usize) = (1, 1000);

/// NotReady handling: retries after the initial attempt, and the pause
/// between them.
pub const RETRY_ATTEMPTS: usize = 3;
pub const RETRY_DELAY_MS: u64 = 500;

/// Tunable query defaults. `Default` reproduces the documented constants;
/// deserializable so deployments can override them from config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Per-symbol cap for caller/callee/reference scans.
    pub limit: usize,
    /// Result cap for ranked queries.
    pub top: usize,
    pub cycle_min_size: usize,
    pub community_min_size: usize,
    pub resolution: f64,
    pub region_min_size: usize,
    pub region_max_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            limit: 20,
            top: 10,
            cycle_min_size: 2,
            community_min_size: 2,
            resolution: 1.0,
            region_min_size: 3,
            region_max_size: 50,
        }
    }
}

pub(crate) fn clamp_usize(name: &str, value: usize, (lo, hi): (usize, usize)) -> usize {
    if value < lo || value > hi {
        let clamped = value.clamp(lo, hi);
        tracing::warn!(param = name, value, clamped, "parameter out of range, clamping");
        clamped
    } else {
        value
    }
}

pub(crate) fn clamp_f64(name: &str, value: f64, (lo, hi): (f64, f64)) -> f64 {
    if !value.is_finite() {
        tracing::warn!(param = name, value, clamped = lo, "non-finite parameter, clamping");
        return lo;
    }
    if value < lo || value > hi {
        let clamped = value.clamp(lo, hi);
        tracing::warn!(param = name, value, clamped, "parameter out of range, clamping");
        clamped
    } else {
        value
    }
}
