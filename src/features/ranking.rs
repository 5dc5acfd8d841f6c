//! Keypoint ranking by detector response.

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::Keypoint;

/// Default number of keypoints kept per image.
pub const DEFAULT_MAX_KEYPOINTS: usize = 500;

/// Whether the detector produced enough keypoints for the requested budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypointSupply {
    Sufficient,
    /// Fewer keypoints than requested; all of them were kept.
    Insufficient { found: usize, requested: usize },
}

/// Keep the `n` strongest keypoints, sorted by descending response.
///
/// When fewer than `n` keypoints are available they are returned untouched
/// (in detector order) and the shortfall is reported. The sort is stable so
/// equal responses keep their detector order. NaN responses sort last.
pub fn top_keypoints(mut keypoints: Vec<Keypoint>, n: usize) -> (Vec<Keypoint>, KeypointSupply) {
    if keypoints.len() < n {
        warn!(
            found = keypoints.len(),
            requested = n,
            "fewer keypoints than requested, keeping all"
        );
        let supply = KeypointSupply::Insufficient {
            found: keypoints.len(),
            requested: n,
        };
        return (keypoints, supply);
    }

    keypoints.sort_by(|a, b| descending_response(a.response, b.response));
    keypoints.truncate(n);
    debug!(kept = keypoints.len(), "ranked keypoints");
    (keypoints, KeypointSupply::Sufficient)
}

fn descending_response(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
