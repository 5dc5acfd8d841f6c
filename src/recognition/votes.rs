//! Per-reference vote counting.

use std::collections::BTreeMap;

use crate::error::DetectorError;
use crate::library::{GeoPoint, GroupId, ReferenceHandle, ReferenceLibrary};
use crate::matching::Correspondence;

/// Number of surviving correspondences per library slot.
///
/// Only slots with at least one vote are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    counts: BTreeMap<usize, usize>,
}

impl VoteTally {
    /// Count one vote per correspondence for the slot it points at.
    ///
    /// Fails if a correspondence names a slot at or beyond `n_slots`.
    pub fn from_correspondences(
        matches: &[Correspondence],
        n_slots: usize,
    ) -> Result<Self, DetectorError> {
        let mut counts = BTreeMap::new();
        for m in matches {
            if m.reference_idx >= n_slots {
                return Err(DetectorError::UnknownReference {
                    slot: m.reference_idx,
                    len: n_slots,
                });
            }
            *counts.entry(m.reference_idx).or_insert(0) += 1;
        }
        Ok(Self { counts })
    }

    /// Sum of all votes.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(slot, votes)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(&slot, &votes)| (slot, votes))
    }

    /// Resolve every voted slot against the library.
    pub fn candidates(&self, library: &ReferenceLibrary) -> Vec<Candidate> {
        self.iter()
            .filter_map(|(slot, votes)| {
                library.get(slot).map(|img| Candidate {
                    slot,
                    handle: img.handle,
                    group: img.group,
                    location: img.location,
                    votes,
                })
            })
            .collect()
    }
}

/// A voted reference image, as seen by the geo filter and the decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub slot: usize,
    pub handle: ReferenceHandle,
    pub group: GroupId,
    pub location: Option<GeoPoint>,
    pub votes: usize,
}
