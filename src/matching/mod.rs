//! Descriptor matching between a query image and the reference pool.
//!
//! Matching is an injected capability ([`DescriptorMatcher`]). The default
//! [`HammingMatcher`] is a brute-force nearest-neighbour search over ORB
//! descriptors; with the `opencv` feature the same contract is served by
//! OpenCV's `BFMatcher`.

pub mod filter;
#[cfg(feature = "opencv")]
pub mod bf;

use anyhow::Result;

use crate::features::OrbDescriptor;

pub use filter::{FilterOutcome, MatchFilterConfig, filter_good_matches};
#[cfg(feature = "opencv")]
pub use bf::BfMatcherBackend;

/// One query descriptor paired with its nearest reference descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Index of the query keypoint / descriptor.
    pub query_idx: usize,
    /// Library slot of the reference image that owns the matched descriptor.
    pub reference_idx: usize,
    /// Index of the matched descriptor within that reference image.
    pub train_idx: usize,
    /// Descriptor distance, `>= 0`.
    pub distance: f32,
}

/// Nearest-neighbour matching of a query against an ordered descriptor pool.
///
/// `pool[i]` holds the descriptors of library slot `i`; every returned
/// correspondence must name a slot of `pool`.
pub trait DescriptorMatcher: Send + Sync {
    fn match_descriptors(
        &self,
        query: &[OrbDescriptor],
        pool: &[&[OrbDescriptor]],
    ) -> Result<Vec<Correspondence>>;
}

/// Number of differing bits between two ORB descriptors.
pub fn hamming_distance(a: &OrbDescriptor, b: &OrbDescriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Brute-force Hamming matcher, one best match per query descriptor.
///
/// Ties go to the earliest slot / descriptor so results are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingMatcher;

impl DescriptorMatcher for HammingMatcher {
    fn match_descriptors(
        &self,
        query: &[OrbDescriptor],
        pool: &[&[OrbDescriptor]],
    ) -> Result<Vec<Correspondence>> {
        let mut matches = Vec::with_capacity(query.len());
        for (query_idx, q) in query.iter().enumerate() {
            let mut best: Option<(u32, usize, usize)> = None;
            for (reference_idx, descriptors) in pool.iter().enumerate() {
                for (train_idx, d) in descriptors.iter().enumerate() {
                    let dist = hamming_distance(q, d);
                    if best.map_or(true, |(b, _, _)| dist < b) {
                        best = Some((dist, reference_idx, train_idx));
                    }
                }
            }
            if let Some((dist, reference_idx, train_idx)) = best {
                matches.push(Correspondence {
                    query_idx,
                    reference_idx,
                    train_idx,
                    distance: dist as f32,
                });
            }
        }
        Ok(matches)
    }
}
