//! Identification results and diagnostics.
//!
//! These types describe what happened for a single query:
//! - the decision (matched group and reference image, or why nothing matched)
//! - optional diagnostics: tally, correspondences of the matched image,
//!   filter statistics and timing

use crate::features::{Keypoint, KeypointSupply};
use crate::library::{GroupId, ReferenceHandle, ReferenceInfo};
use crate::matching::Correspondence;

/// Why a query was not identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// Empty library, or no correspondence survived filtering.
    NoCandidates,
    /// The best reference did not lead the best other group by enough votes.
    Ambiguous { best_votes: usize, runner_up_votes: usize },
}

impl std::fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidates"),
            Self::Ambiguous { .. } => write!(f, "ambiguous"),
        }
    }
}

/// The reference image a query was identified as.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedReference {
    pub group: GroupId,
    pub reference: ReferenceInfo,
    pub votes: usize,
    /// Votes of the strongest other group, if any competed.
    pub runner_up_votes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Match(MatchedReference),
    NoMatch(NoMatchReason),
}

impl Decision {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    /// Matched group, if any.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Self::Match(m) => Some(m.group),
            Self::NoMatch(_) => None,
        }
    }
}

/// Result of one `identify` call.
#[derive(Debug, Clone)]
pub struct IdentifyOutcome {
    pub decision: Decision,
    /// Present when diagnostics collection is enabled.
    pub diagnostics: Option<Diagnostics>,
}

impl IdentifyOutcome {
    pub(crate) fn no_candidates() -> Self {
        Self {
            decision: Decision::NoMatch(NoMatchReason::NoCandidates),
            diagnostics: None,
        }
    }
}

/// Votes of one reference image after geo filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyEntry {
    pub handle: ReferenceHandle,
    pub group: GroupId,
    pub votes: usize,
}

/// Per-query details for visualization and debugging.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Keypoints the query was described with.
    pub query_keypoints: Vec<Keypoint>,
    pub keypoint_supply: KeypointSupply,
    /// Raw correspondences returned by the matcher.
    pub n_correspondences: usize,
    /// Correspondences that passed the distance filter.
    pub n_filtered: usize,
    pub filter_threshold: Option<f32>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    /// Final tally, strongest first.
    pub tally: Vec<TallyEntry>,
    /// Filtered correspondences that voted for the matched reference.
    pub matched_correspondences: Vec<Correspondence>,
    pub timing: TimingStats,
}

/// Timing breakdown for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub extract_ms: f64,
    pub match_ms: f64,
    pub decide_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(NoMatchReason::NoCandidates.to_string(), "no candidates");
        let ambiguous = NoMatchReason::Ambiguous {
            best_votes: 10,
            runner_up_votes: 3,
        };
        assert_eq!(ambiguous.to_string(), "ambiguous");
    }

    #[test]
    fn test_no_candidates_outcome() {
        let outcome = IdentifyOutcome::no_candidates();
        assert!(!outcome.decision.is_match());
        assert_eq!(outcome.decision.group(), None);
        assert!(outcome.diagnostics.is_none());
    }
}
