//! Error type surfaced by the detector.
//!
//! Only genuine failures live here. An empty library, an ambiguous tally or
//! missing geolocation are ordinary outcomes, see
//! [`crate::recognition::NoMatchReason`].

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// The image could not be read or decoded.
    #[error("failed to load image {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Resizing, detection or description failed.
    #[error("feature extraction failed for {}: {source}", .path.display())]
    Features {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The descriptor matcher failed.
    #[error("descriptor matching failed: {source}")]
    Matching {
        #[source]
        source: BoxError,
    },

    /// A correspondence named a library slot that does not exist.
    #[error("correspondence references library slot {slot}, library holds {len} images")]
    UnknownReference { slot: usize, len: usize },
}

impl DetectorError {
    pub(crate) fn load(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Load {
            path: path.into(),
            source: err.into(),
        }
    }

    pub(crate) fn features(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Features {
            path: path.into(),
            source: err.into(),
        }
    }

    pub(crate) fn matching(err: anyhow::Error) -> Self {
        Self::Matching { source: err.into() }
    }

    /// True for [`DetectorError::Load`].
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Load { .. })
    }
}
