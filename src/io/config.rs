//! JSON configuration loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::system::DetectorConfig;

/// Read a [`DetectorConfig`] from a JSON file. Missing fields keep their defaults.
pub fn load_config(path: &Path) -> Result<DetectorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse config {}", path.display()))
}
