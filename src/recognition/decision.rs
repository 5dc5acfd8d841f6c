//! Confidence-margin decision over the vote candidates.
//!
//! A plain majority vote is unreliable when visually similar references
//! collect near-equal votes. The best candidate is accepted only when its
//! lead over the best candidate of a *different* group is large enough:
//!
//! ```text
//! diff = best - second_best
//! accept  <=>  diff^2 > filter_ratio * best
//! ```
//!
//! References of the same group never compete with each other.

use serde::Deserialize;
use tracing::debug;

use super::votes::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub filter_ratio: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self { filter_ratio: 5.0 }
    }
}

/// Outcome of the margin test.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted {
        best: Candidate,
        /// Strongest candidate of another group, if any.
        runner_up: Option<Candidate>,
    },
    /// Nothing to decide on.
    NoCandidates,
    /// The lead of `best` over `runner_up` is too small.
    Ambiguous { best: Candidate, runner_up: Candidate },
}

/// Applies the margin test.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Decide on `candidates`. The order of `candidates` does not matter.
    pub fn decide(&self, candidates: &[Candidate]) -> Verdict {
        let Some(best) = candidates.iter().copied().reduce(stronger) else {
            return Verdict::NoCandidates;
        };

        let runner_up = candidates
            .iter()
            .copied()
            .filter(|c| c.group != best.group)
            .reduce(stronger);

        let Some(runner_up) = runner_up else {
            debug!(best = %best.handle, votes = best.votes, "single group, accepted");
            return Verdict::Accepted {
                best,
                runner_up: None,
            };
        };

        let diff = (best.votes - runner_up.votes) as f64;
        let required = self.config.filter_ratio * best.votes as f64;
        debug!(
            best = %best.handle,
            best_votes = best.votes,
            runner_up = %runner_up.handle,
            runner_up_votes = runner_up.votes,
            margin = diff * diff,
            required,
            "margin test"
        );

        if diff * diff > required {
            Verdict::Accepted {
                best,
                runner_up: Some(runner_up),
            }
        } else {
            Verdict::Ambiguous { best, runner_up }
        }
    }
}

/// Higher vote count wins; equal counts go to the lower slot.
fn stronger(a: Candidate, b: Candidate) -> Candidate {
    if b.votes > a.votes || (b.votes == a.votes && b.slot < a.slot) {
        b
    } else {
        a
    }
}
