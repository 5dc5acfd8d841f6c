//! Detector configuration.

use serde::Deserialize;

use crate::features::ranking::DEFAULT_MAX_KEYPOINTS;
use crate::matching::MatchFilterConfig;
use crate::recognition::{DecisionConfig, GeoFilterConfig};

/// All tunables of the identification pipeline.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Keypoints kept per image after ranking by response.
    pub max_keypoints: usize,
    /// Downscale images so the longest side is at most this many pixels.
    pub max_image_side: Option<u32>,
    pub match_filter: MatchFilterConfig,
    pub decision: DecisionConfig,
    pub geo: GeoFilterConfig,
    /// Attach diagnostics to every identification result.
    pub collect_diagnostics: bool,
    /// Extraction threads for bulk library builds; 0 uses available parallelism.
    pub workers: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_keypoints: DEFAULT_MAX_KEYPOINTS,
            max_image_side: None,
            match_filter: MatchFilterConfig::default(),
            decision: DecisionConfig::default(),
            geo: GeoFilterConfig::default(),
            collect_diagnostics: true,
            workers: 0,
        }
    }
}

impl DetectorConfig {
    /// Resolved number of extraction threads.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
