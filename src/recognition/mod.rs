//! Recognition: from filtered correspondences to an identification.
//!
//! - [`votes`] - per-reference tally
//! - [`geo`] - optional geolocation pre-filter
//! - [`decision`] - confidence-margin decision
//! - [`result`] - outcome and diagnostics types

pub mod decision;
pub mod geo;
pub mod result;
pub mod votes;

pub use decision::{DecisionConfig, DecisionEngine, Verdict};
pub use geo::{GeoFilterConfig, haversine_distance_m, retain_nearby};
pub use result::{
    Decision, Diagnostics, IdentifyOutcome, MatchedReference, NoMatchReason, TallyEntry,
    TimingStats,
};
pub use votes::{Candidate, VoteTally};
