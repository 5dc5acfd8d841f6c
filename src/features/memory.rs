//! Deterministic in-memory feature backend.
//!
//! Serves pre-computed keypoints and descriptors registered under a path.
//! Used by tests and by tooling that already has features at hand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use parking_lot::RwLock;

use super::{FeatureBackend, FeatureSet, Keypoint, OrbDescriptor, downscaled_size};

/// A "decoded image": its size plus the features a detector would find on it.
#[derive(Debug, Clone, Default)]
pub struct SyntheticImage {
    pub width: u32,
    pub height: u32,
    pub features: Vec<(Keypoint, OrbDescriptor)>,
}

impl SyntheticImage {
    pub fn new(width: u32, height: u32, features: Vec<(Keypoint, OrbDescriptor)>) -> Self {
        Self {
            width,
            height,
            features,
        }
    }
}

/// Backend resolving paths against a registry of [`SyntheticImage`]s.
#[derive(Default)]
pub struct InMemoryBackend {
    images: RwLock<HashMap<PathBuf, SyntheticImage>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the image served for `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, image: SyntheticImage) {
        self.images.write().insert(path.into(), image);
    }
}

/// Pseudo-random descriptor derived from `seed` (splitmix64). Distinct seeds
/// land roughly 128 bits apart.
pub fn seeded_descriptor(seed: u64) -> OrbDescriptor {
    let mut d = [0u8; 32];
    let mut state = seed;
    for chunk in d.chunks_mut(8) {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        chunk.copy_from_slice(&(z ^ (z >> 31)).to_le_bytes());
    }
    d
}

impl FeatureBackend for InMemoryBackend {
    type Image = SyntheticImage;

    fn load_image(&self, path: &Path) -> Result<SyntheticImage> {
        match self.images.read().get(path) {
            Some(image) => Ok(image.clone()),
            None => bail!("no image registered at {}", path.display()),
        }
    }

    fn resize(&self, mut image: SyntheticImage, max_side: u32) -> Result<SyntheticImage> {
        let Some((width, height, scale)) = downscaled_size(image.width, image.height, max_side)
        else {
            return Ok(image);
        };
        image.width = width;
        image.height = height;
        let scale = scale as f32;
        for (kp, _) in &mut image.features {
            kp.pt.x *= scale;
            kp.pt.y *= scale;
            kp.size *= scale;
        }
        Ok(image)
    }

    fn detect(&self, image: &SyntheticImage) -> Result<Vec<Keypoint>> {
        // class_id carries the feature's slot so `describe` can find its descriptor.
        Ok(image
            .features
            .iter()
            .enumerate()
            .map(|(i, (kp, _))| Keypoint {
                class_id: i as i32,
                ..*kp
            })
            .collect())
    }

    fn describe(&self, image: &SyntheticImage, keypoints: Vec<Keypoint>) -> Result<FeatureSet> {
        let mut set = FeatureSet::default();
        for kp in keypoints {
            let Ok(slot) = usize::try_from(kp.class_id) else {
                continue;
            };
            if let Some((_, desc)) = image.features.get(slot) {
                set.keypoints.push(kp);
                set.descriptors.push(*desc);
            }
        }
        Ok(set)
    }
}
