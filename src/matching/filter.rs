//! Distance-based rejection of noisy correspondences.
//!
//! The acceptance threshold adapts to the correspondence set itself:
//! `max(min_multiplier * min_distance, distance_floor)`.

use serde::Deserialize;
use tracing::debug;

use super::Correspondence;

/// Tunable constants of the good-match filter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchFilterConfig {
    /// Multiple of the smallest distance still accepted.
    pub min_multiplier: f32,
    /// Lower bound of the threshold, so exact matches do not reject near-exact ones.
    pub distance_floor: f32,
}

impl Default for MatchFilterConfig {
    fn default() -> Self {
        Self {
            min_multiplier: 3.0,
            distance_floor: 0.02,
        }
    }
}

/// Filtered correspondences plus the statistics that produced them.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<Correspondence>,
    /// Smallest distance seen, `None` for empty input.
    pub min_distance: Option<f32>,
    /// Largest distance seen, `None` for empty input.
    pub max_distance: Option<f32>,
    /// Acceptance threshold applied, `None` for empty input.
    pub threshold: Option<f32>,
}

/// Keep correspondences with `distance <= max(min_multiplier * min, floor)`.
///
/// Filtering an already filtered list returns it unchanged: the minimum
/// survives, so the threshold does not move.
pub fn filter_good_matches(matches: &[Correspondence], config: &MatchFilterConfig) -> FilterOutcome {
    let mut min_dist = f32::MAX;
    let mut max_dist = 0.0f32;
    for m in matches {
        if m.distance < min_dist {
            min_dist = m.distance;
        }
        if m.distance > max_dist {
            max_dist = m.distance;
        }
    }

    if matches.is_empty() {
        return FilterOutcome {
            kept: Vec::new(),
            min_distance: None,
            max_distance: None,
            threshold: None,
        };
    }

    let threshold = (config.min_multiplier * min_dist).max(config.distance_floor);
    let kept: Vec<Correspondence> = matches
        .iter()
        .filter(|m| m.distance <= threshold)
        .copied()
        .collect();

    debug!(
        total = matches.len(),
        kept = kept.len(),
        min_dist,
        max_dist,
        threshold,
        "filtered correspondences"
    );

    FilterOutcome {
        kept,
        min_distance: Some(min_dist),
        max_distance: Some(max_dist),
        threshold: Some(threshold),
    }
}
