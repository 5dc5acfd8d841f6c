//! OpenCV brute-force Hamming matcher.

use anyhow::{Context, Result};
use opencv::core::{DMatch, Mat, Vector};
use opencv::features2d::BFMatcher;
use opencv::prelude::*;

use super::{Correspondence, DescriptorMatcher};
use crate::features::OrbDescriptor;
use crate::features::orb::descriptors_to_mat;

/// `BFMatcher` with `NORM_HAMMING`, trained on the whole pool per query.
///
/// The matcher is rebuilt for each call, so the library stays the single
/// owner of reference descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BfMatcherBackend;

impl DescriptorMatcher for BfMatcherBackend {
    fn match_descriptors(
        &self,
        query: &[OrbDescriptor],
        pool: &[&[OrbDescriptor]],
    ) -> Result<Vec<Correspondence>> {
        // OpenCV rejects empty train images, so keep a map from train image to slot.
        let mut train = Vector::<Mat>::new();
        let mut slots = Vec::new();
        for (slot, descriptors) in pool.iter().enumerate() {
            if descriptors.is_empty() {
                continue;
            }
            train.push(descriptors_to_mat(descriptors)?);
            slots.push(slot);
        }
        if query.is_empty() || slots.is_empty() {
            return Ok(Vec::new());
        }

        let mut matcher = BFMatcher::new(opencv::core::NORM_HAMMING, false)?;
        matcher.add(&train)?;
        let query_mat = descriptors_to_mat(query)?;
        let mut matches = Vector::<DMatch>::new();
        matcher.match_(&query_mat, &mut matches, &Vector::<Mat>::new())?;

        matches
            .iter()
            .map(|m| {
                let slot = usize::try_from(m.img_idx)
                    .ok()
                    .and_then(|i| slots.get(i).copied())
                    .with_context(|| format!("BFMatcher returned unknown train image {}", m.img_idx))?;
                Ok(Correspondence {
                    query_idx: m.query_idx as usize,
                    reference_idx: slot,
                    train_idx: m.train_idx as usize,
                    distance: m.distance,
                })
            })
            .collect()
    }
}
